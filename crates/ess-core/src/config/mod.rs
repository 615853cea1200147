//! Portal configuration
//!
//! Configuration is layered: built-in defaults, then a config file
//! (`ess_config.toml`, `.json` or `.yaml`), then `ESS_*` environment
//! variables, then command-line overrides.

pub mod env_loader;
pub mod file_loader;
pub mod loader;
pub mod model;
pub mod timeouts;

pub use loader::{ConfigLoader, ConfigSource, load_config};
pub use model::{PortalConfig, RouteConfig, SessionConfig};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "ess_config.toml";
