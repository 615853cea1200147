//! Command implementations

pub mod attendance;
pub mod auth;
pub mod config;
pub mod views;

use ess_core::auth::{default_secret_path, load_or_create_secret};
use ess_core::config::{PortalConfig, load_config};
use ess_core::error::EssResult;
use ess_sdk::Portal;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Options shared by every command
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config_file: PathBuf,
    pub base_url: Option<String>,
    pub verbose: bool,
}

impl CommandContext {
    /// Command-line overrides, keyed like the `ESS_*` variables
    pub fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(base_url) = &self.base_url {
            overrides.insert("base_url".to_string(), base_url.clone());
        }
        overrides
    }

    /// Effective configuration; a missing config file falls back to defaults
    pub fn config(&self) -> EssResult<PortalConfig> {
        let file = self
            .config_file
            .exists()
            .then_some(self.config_file.as_path());
        if file.is_none() {
            tracing::debug!(
                "No config file at {}, using defaults",
                self.config_file.display()
            );
        }
        load_config(file, self.overrides())
    }

    /// Portal whose session persists between invocations
    pub fn portal(&self) -> EssResult<Portal> {
        let mut config = self.config()?;
        with_persistent_session(&mut config, None)?;
        Portal::new(config)
    }
}

/// Fill in the sealed session file and its secret when the configuration
/// leaves them unset. `home` replaces `~/.ess` for the default paths.
pub fn with_persistent_session(config: &mut PortalConfig, home: Option<&Path>) -> EssResult<()> {
    let secret_path = match home {
        Some(home) => home.join("secret"),
        None => default_secret_path()?,
    };

    if config.session.file.is_none() {
        let dir = secret_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.session.file = Some(dir.join("session"));
    }
    if config.session.secret.is_none() {
        let secret = load_or_create_secret(&secret_path, || uuid::Uuid::new_v4().to_string())?;
        config.session.secret = Some(secret);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_persistent_session_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = PortalConfig::default();

        with_persistent_session(&mut config, Some(temp_dir.path())).unwrap();

        assert_eq!(config.session.file, Some(temp_dir.path().join("session")));
        let secret = config.session.secret.clone().unwrap();
        assert_eq!(secret.len(), 36);
        assert!(temp_dir.path().join("secret").exists());

        // A second invocation reuses the same secret
        let mut again = PortalConfig::default();
        with_persistent_session(&mut again, Some(temp_dir.path())).unwrap();
        assert_eq!(again.session.secret, Some(secret));
    }

    #[test]
    fn test_configured_session_is_kept() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = PortalConfig::default();
        config.session.file = Some(PathBuf::from("/var/lib/ess/session"));
        config.session.secret = Some("configured".to_string());

        with_persistent_session(&mut config, Some(temp_dir.path())).unwrap();

        assert_eq!(config.session.file, Some(PathBuf::from("/var/lib/ess/session")));
        assert_eq!(config.session.secret.as_deref(), Some("configured"));
        assert!(!temp_dir.path().join("secret").exists());
    }

    #[test]
    fn test_missing_config_file_uses_defaults_with_override() {
        let temp_dir = TempDir::new().unwrap();
        let context = CommandContext {
            config_file: temp_dir.path().join("absent.toml"),
            base_url: Some("https://hr.example.com".to_string()),
            verbose: false,
        };

        let config = context.config().unwrap();
        assert_eq!(config.base_url, "https://hr.example.com");
    }
}
