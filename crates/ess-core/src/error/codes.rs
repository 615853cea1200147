//! Stable error codes

use super::types::EssError;

impl EssError {
    /// Get the error code for programmatic handling.
    ///
    /// The three credential-exchange failures use the short codes the login
    /// form switches on: `invalid_credentials`, `invalid_code`, `transient`.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials { .. } => "invalid_credentials",
            Self::InvalidCode { .. } => "invalid_code",
            Self::Transient { .. } => "transient",
            Self::ExpiredAccessToken { .. } => "expired_access_token",
            Self::RefreshFailed { .. } => "refresh_failed",
            Self::NotAuthenticated => "not_authenticated",
            Self::Validation { .. } => "validation",
            Self::Http { .. } => "http",
            Self::ForeignOrigin { .. } => "foreign_origin",
            Self::InvalidInput { .. } => "invalid_input",
            Self::Config { .. } => "config",
            Self::Storage { .. } => "storage",
            Self::Io { .. } => "io",
            Self::Json { .. } => "json",
            Self::Cancelled => "cancelled",
        }
    }

    /// HTTP status attached to the error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transient { status_code, .. } | Self::Http { status_code, .. } => *status_code,
            Self::Validation { status_code, .. } => Some(*status_code),
            Self::ExpiredAccessToken { .. } => Some(401),
            _ => None,
        }
    }

    /// Whether this error ended the session
    pub fn is_session_ending(&self) -> bool {
        matches!(self, Self::RefreshFailed { .. })
    }

    /// Whether the caller may offer a manual retry
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}
