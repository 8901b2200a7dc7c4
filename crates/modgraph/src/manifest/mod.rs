//! Plugin module manifests.
//!
//! This module handles:
//! - Tokenizing and parsing `<Module>.Build.cs` descriptors
//! - The immutable [`Manifest`] record and its derived dependency edges
//! - Build-configuration predicates guarding conditional blocks
//! - Writing manifests back in canonical form

mod condition;
mod lexer;
mod model;
mod parser;
mod serialize;

pub use condition::{BuildConfig, Condition, Predicate, PredicateRef};
pub use model::{
    ConditionalBlock, Dependency, DependencyEdge, DependencyList, EffectiveDependencies,
    EffectiveDependency, MANIFEST_SUFFIX, Manifest, PchUsage, UnknownField, Visibility,
};
pub use parser::{
    PRIVATE_DEPENDENCIES, PUBLIC_DEPENDENCIES, ParseOutcome, is_valid_module_name, parse_manifest,
    parse_manifest_bytes,
};
pub use serialize::serialize;
