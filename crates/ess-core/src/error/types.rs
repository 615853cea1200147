//! Core error type

use thiserror::Error;

/// Result type alias for portal operations
pub type EssResult<T> = Result<T, EssError>;

/// Extension trait for turning `Option`s into errors
pub trait OptionExt<T> {
    /// Convert `None` into the given error
    fn or_ess(self, error: EssError) -> EssResult<T>;

    /// Convert `None` into [`EssError::NotAuthenticated`]
    fn or_unauthenticated(self) -> EssResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_ess(self, error: EssError) -> EssResult<T> {
        self.ok_or(error)
    }

    fn or_unauthenticated(self) -> EssResult<T> {
        self.ok_or(EssError::NotAuthenticated)
    }
}

/// Main error type for the portal client
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EssError {
    /// Wrong email or password
    #[error("Invalid credentials: {}", .message.as_deref().unwrap_or("invalid email or password"))]
    InvalidCredentials { message: Option<String> },

    /// Wrong or expired second-factor code
    #[error("Invalid verification code: {}", .message.as_deref().unwrap_or("invalid or expired code"))]
    InvalidCode { message: Option<String> },

    /// The backend rejected the access token even after one refresh
    #[error("Access token rejected: {message}")]
    ExpiredAccessToken { message: String },

    /// The refresh token itself was rejected; the session has been torn down
    #[error("Session refresh failed: {message}")]
    RefreshFailed { message: String },

    /// No live session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Network failure, timeout or server-side hiccup
    #[error("Transient error: {message}")]
    Transient {
        message: String,
        status_code: Option<u16>,
    },

    /// Backend rejected the payload
    #[error("Validation error: {message}")]
    Validation { message: String, status_code: u16 },

    /// Any other non-success response
    #[error("HTTP error: {message}")]
    Http {
        message: String,
        status_code: Option<u16>,
    },

    /// A request would have carried the access token to another origin
    #[error("Refusing to send credentials to foreign origin: {url}")]
    ForeignOrigin { url: String },

    /// Caller supplied bad input
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Session persistence errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },

    /// The caller stopped waiting for the response
    #[error("Request was cancelled")]
    Cancelled,
}
