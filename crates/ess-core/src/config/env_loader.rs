//! Environment variable-based configuration overrides
//!
//! Every override key has an `ESS_`-prefixed environment variable:
//! `base_url` is read from `ESS_BASE_URL`, `auth_timeout_secs` from
//! `ESS_AUTH_TIMEOUT_SECS`, and so on.

use super::model::PortalConfig;
use crate::auth::ExpirySemantics;
use crate::error::{EssError, EssResult};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Keys understood by [`apply_overrides`]
pub const OVERRIDE_KEYS: &[&str] = &[
    "base_url",
    "auth_timeout_secs",
    "request_timeout_secs",
    "refresh_skew_secs",
    "expiry_semantics",
    "session_file",
    "session_secret",
    "max_attachment_bytes",
];

/// Environment variable name for an override key
pub fn env_var_name(key: &str) -> String {
    format!("ESS_{}", key.to_ascii_uppercase())
}

/// Apply `ESS_*` environment variables on top of `config`
pub fn apply_env(config: &mut PortalConfig) -> EssResult<()> {
    apply_overrides(config, |key| env::var(env_var_name(key)).ok())
}

/// Apply overrides from any key/value source on top of `config`
pub fn apply_overrides<F>(config: &mut PortalConfig, lookup: F) -> EssResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base_url) = lookup("base_url") {
        config.base_url = base_url;
    }
    if let Some(value) = lookup("auth_timeout_secs") {
        config.auth_timeout = parse_secs("auth_timeout_secs", &value)?;
    }
    if let Some(value) = lookup("request_timeout_secs") {
        config.request_timeout = parse_secs("request_timeout_secs", &value)?;
    }
    if let Some(value) = lookup("refresh_skew_secs") {
        config.refresh_skew = parse_secs("refresh_skew_secs", &value)?;
    }
    if let Some(value) = lookup("expiry_semantics") {
        config.expiry_semantics = value.parse::<ExpirySemantics>()?;
    }
    if let Some(value) = lookup("session_file") {
        config.session.file = Some(PathBuf::from(value));
    }
    if let Some(value) = lookup("session_secret") {
        config.session.secret = Some(value);
    }
    if let Some(value) = lookup("max_attachment_bytes") {
        config.max_attachment_bytes = value.trim().parse().map_err(|_| {
            EssError::config_with_context(
                "Invalid max_attachment_bytes value",
                format!("Parsing '{}'", value),
            )
        })?;
    }
    Ok(())
}

fn parse_secs(key: &str, value: &str) -> EssResult<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| {
            EssError::config_with_context(
                format!("Invalid {} value", env_var_name(key)),
                format!("Parsing seconds value '{}'", value),
            )
        })
}
