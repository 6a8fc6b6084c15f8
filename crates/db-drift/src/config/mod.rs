//! Configuration loading and validation.

mod tree;
mod types;
mod validation;

pub use tree::{expand_path, ConfigTree};
pub use types::*;

use crate::error::{DriftError, Result};
use std::path::Path;
use tracing::debug;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_yaml(&read_config_file(path.as_ref())?)
    }

    /// Load configuration from a YAML file, overlaying process environment
    /// variables that start with `env_prefix`.
    pub fn load_with_env<P: AsRef<Path>>(path: P, env_prefix: &str) -> Result<Self> {
        let content = read_config_file(path.as_ref())?;
        Self::from_yaml_with_env(&content, env_prefix, std::env::vars())
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string with an explicit set of
    /// environment variables overlaid before deserialization.
    pub fn from_yaml_with_env<I>(yaml: &str, env_prefix: &str, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut tree = ConfigTree::from_yaml(yaml)?;
        let applied = tree.apply_env(env_prefix, vars);
        if applied > 0 {
            debug!("Applied {} environment override(s)", applied);
        }
        Self::from_tree(tree)
    }

    /// Build a typed configuration from an untyped tree.
    pub fn from_tree(tree: ConfigTree) -> Result<Self> {
        let config: Config = serde_yaml::from_value(tree.into_value())?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

fn read_config_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        DriftError::Config(format!("cannot read config file {}: {}", path.display(), e))
    })
}
