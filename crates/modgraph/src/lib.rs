//! modgraph library
//!
//! Parses plugin module build descriptors, assembles them into a manifest
//! set, resolves dependencies under an explicit build configuration and
//! validates the result. The `modgraph` binary wraps these in a CLI.

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod loader;
pub mod manifest;
pub mod registry;
pub mod resolver;
pub mod validator;
