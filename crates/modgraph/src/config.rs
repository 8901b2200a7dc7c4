//! Configuration loaded from environment variables.
//!
//! Command-line flags take precedence over these values.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::ValueEnum;

use crate::manifest::BuildConfig;

/// Which build configurations a command resolves under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BuildSelection {
    Editor,
    Runtime,
    /// Editor and runtime.
    #[default]
    All,
}

impl BuildSelection {
    pub fn configs(self) -> Vec<BuildConfig> {
        match self {
            BuildSelection::Editor => vec![BuildConfig::editor()],
            BuildSelection::Runtime => vec![BuildConfig::runtime()],
            BuildSelection::All => vec![BuildConfig::editor(), BuildConfig::runtime()],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildSelection::Editor => "editor",
            BuildSelection::Runtime => "runtime",
            BuildSelection::All => "all",
        }
    }
}

impl fmt::Display for BuildSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildSelection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "editor" => Ok(BuildSelection::Editor),
            "runtime" => Ok(BuildSelection::Runtime),
            "all" => Ok(BuildSelection::All),
            other => Err(anyhow!(
                "unknown build configuration '{other}' (expected editor, runtime or all)"
            )),
        }
    }
}

/// Tool configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host module registry file (TOML). When None, the built-in stub is used.
    pub registry: Option<PathBuf>,

    /// Maximum descriptors parsed concurrently (default: 8).
    pub jobs: usize,

    /// Configurations `validate` resolves under when `--config` is not given
    /// (default: all).
    pub default_config: BuildSelection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: None,
            jobs: 8,
            default_config: BuildSelection::All,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a
    /// variable if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let registry = lookup("MODGRAPH_REGISTRY")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let jobs: usize = lookup("MODGRAPH_JOBS")
            .unwrap_or_else(|| "8".to_string())
            .parse()
            .context("MODGRAPH_JOBS must be a positive integer")?;
        if jobs == 0 {
            anyhow::bail!("MODGRAPH_JOBS must be at least 1");
        }

        let default_config = match lookup("MODGRAPH_DEFAULT_CONFIG") {
            Some(value) => value
                .parse()
                .context("MODGRAPH_DEFAULT_CONFIG is invalid")?,
            None => BuildSelection::All,
        };

        Ok(Self {
            registry,
            jobs,
            default_config,
        })
    }
}
