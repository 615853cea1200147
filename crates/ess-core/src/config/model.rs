//! Configuration data model

use super::timeouts;
use crate::auth::ExpirySemantics;
use crate::error::{EssError, EssResult};
use crate::navigation::Destination;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default backend origin
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default upper bound for base64-encoded attachments (5 MiB)
pub const DEFAULT_MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

/// Top-level configuration for a portal client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Backend origin; the access token is never sent anywhere else
    pub base_url: String,
    /// Bound on login / verify / resend / refresh calls
    #[serde(with = "humantime_serde")]
    pub auth_timeout: Duration,
    /// Bound on authorized domain requests
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Tokens expiring within this window count as expired
    #[serde(with = "humantime_serde")]
    pub refresh_skew: Duration,
    /// How to read `expiresIn` in token responses
    pub expiry_semantics: ExpirySemantics,
    /// Navigation entry points
    pub routes: RouteConfig,
    /// Session persistence
    pub session: SessionConfig,
    /// Largest file accepted for base64 upload
    pub max_attachment_bytes: usize,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_timeout: timeouts::auth::request_timeout(),
            request_timeout: timeouts::network::http_request_timeout(),
            refresh_skew: timeouts::auth::refresh_skew(),
            expiry_semantics: ExpirySemantics::default(),
            routes: RouteConfig::default(),
            session: SessionConfig::default(),
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }
}

impl PortalConfig {
    /// Config pointing at the given backend, defaults elsewhere
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Parsed backend origin
    pub fn base_url(&self) -> EssResult<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            EssError::config_with_context(
                format!("Invalid base_url: {}", e),
                format!("Parsing '{}'", self.base_url),
            )
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(EssError::config(format!(
                "base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(EssError::config("base_url must be an absolute origin"));
        }
        Ok(url)
    }

    /// Validate the configuration
    pub fn validate(&self) -> EssResult<()> {
        self.base_url()?;
        if self.auth_timeout.is_zero() {
            return Err(EssError::config("auth_timeout must be greater than zero"));
        }
        if self.request_timeout.is_zero() {
            return Err(EssError::config("request_timeout must be greater than zero"));
        }
        if self.max_attachment_bytes == 0 {
            return Err(EssError::config(
                "max_attachment_bytes must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Paths of the navigation entry points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    pub login: String,
    pub onboarding: String,
    pub dashboard: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            onboarding: "/onboarding".to_string(),
            dashboard: "/dashboard".to_string(),
        }
    }
}

impl RouteConfig {
    /// Path for a destination
    pub fn path_for(&self, destination: Destination) -> &str {
        match destination {
            Destination::Login => &self.login,
            Destination::Onboarding => &self.onboarding,
            Destination::Dashboard => &self.dashboard,
        }
    }
}

/// Session persistence settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sealed session file; `None` keeps the session in memory only
    pub file: Option<PathBuf>,
    /// Key for the session file's integrity tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}
