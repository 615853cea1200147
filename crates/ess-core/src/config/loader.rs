//! Configuration loading from multiple sources

use super::env_loader::{apply_env, apply_overrides};
use super::file_loader::load_from_file;
use super::model::PortalConfig;
use crate::error::EssResult;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Source of configuration data
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Configuration from a file (replaces everything loaded before it)
    File(PathBuf),
    /// `ESS_*` environment variables
    Environment,
    /// Overrides from command line arguments, keyed like the env overrides
    CommandLine(HashMap<String, String>),
    /// Default configuration
    Default,
}

/// Configuration loader with support for multiple sources
#[derive(Debug, Default)]
pub struct ConfigLoader {
    sources: Vec<ConfigSource>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration source
    pub fn add_source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Add a file source
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_source(ConfigSource::File(path.as_ref().to_path_buf()))
    }

    /// Add environment variables source
    pub fn with_env(self) -> Self {
        self.add_source(ConfigSource::Environment)
    }

    /// Add command line arguments source
    pub fn with_args(self, args: HashMap<String, String>) -> Self {
        self.add_source(ConfigSource::CommandLine(args))
    }

    /// Add default configuration source
    pub fn with_defaults(self) -> Self {
        self.add_source(ConfigSource::Default)
    }

    /// Load configuration from all sources, in order
    pub fn load(self) -> EssResult<PortalConfig> {
        let mut config = PortalConfig::default();

        for source in &self.sources {
            match source {
                ConfigSource::File(path) => {
                    tracing::debug!("Loading config from file: {}", path.display());
                    config = load_from_file(path)?;
                }
                ConfigSource::Environment => {
                    tracing::debug!("Applying config from environment");
                    apply_env(&mut config)?;
                }
                ConfigSource::CommandLine(args) => {
                    tracing::debug!("Applying {} command line override(s)", args.len());
                    apply_overrides(&mut config, |key| args.get(key).cloned())?;
                }
                ConfigSource::Default => {
                    config = PortalConfig::default();
                }
            }
        }

        config.validate()?;
        tracing::debug!("Config loaded - backend: {}", config.base_url);
        Ok(config)
    }
}

/// Load configuration the standard way: defaults, file, env, then overrides
pub fn load_config(
    config_file: Option<&Path>,
    overrides: HashMap<String, String>,
) -> EssResult<PortalConfig> {
    let mut loader = ConfigLoader::new().with_defaults();
    if let Some(path) = config_file {
        loader = loader.with_file(path);
    }
    loader.with_env().with_args(overrides).load()
}
