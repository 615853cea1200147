//! Centralized timeout configuration
//!
//! Default timeout values for portal operations. All values can be
//! overridden via configuration.

use std::time::Duration;

/// Timeouts for the credential and token endpoints
pub mod auth {
    use super::*;

    /// Bound on login, verify-code, resend-code and refresh calls (15 seconds)
    pub const REQUEST_SECS: u64 = 15;

    /// Tokens expiring within this window are refreshed before use (60 seconds)
    pub const REFRESH_SKEW_SECS: u64 = 60;

    /// Get auth request timeout as Duration
    pub fn request_timeout() -> Duration {
        Duration::from_secs(REQUEST_SECS)
    }

    /// Get refresh skew as Duration
    pub fn refresh_skew() -> Duration {
        Duration::from_secs(REFRESH_SKEW_SECS)
    }
}

/// Timeouts for authorized domain requests
pub mod network {
    use super::*;

    /// Default timeout for domain requests (30 seconds)
    pub const HTTP_REQUEST_SECS: u64 = 30;

    /// Default connect timeout (10 seconds)
    pub const CONNECT_SECS: u64 = 10;

    /// Get HTTP request timeout as Duration
    pub fn http_request_timeout() -> Duration {
        Duration::from_secs(HTTP_REQUEST_SECS)
    }

    /// Get connect timeout as Duration
    pub fn connect_timeout() -> Duration {
        Duration::from_secs(CONNECT_SECS)
    }
}
