//! User-facing messages and classification

use super::types::EssError;

/// Error category for user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Wrong credentials or code; shown inline on the form
    Authentication,
    /// Session is gone; the user must log in again
    SessionExpired,
    /// Network connectivity issues; dismissible notification
    Network,
    /// Backend rejected the payload; field or form level message
    Validation,
    /// Invalid user input caught before any request
    UserInput,
    /// Configuration issues
    Configuration,
    /// Local persistence and file system errors
    Storage,
    /// User-initiated cancellation
    Cancellation,
    /// Everything else
    Internal,
}

impl ErrorCategory {
    /// Get a user-friendly category name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Authentication => "Authentication Error",
            Self::SessionExpired => "Session Expired",
            Self::Network => "Network Error",
            Self::Validation => "Validation Error",
            Self::UserInput => "Invalid Input",
            Self::Configuration => "Configuration Error",
            Self::Storage => "Storage Error",
            Self::Cancellation => "Cancelled",
            Self::Internal => "Error",
        }
    }
}

impl EssError {
    /// Classify the error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidCredentials { .. } | Self::InvalidCode { .. } => {
                ErrorCategory::Authentication
            }
            Self::RefreshFailed { .. }
            | Self::NotAuthenticated
            | Self::ExpiredAccessToken { .. } => ErrorCategory::SessionExpired,
            Self::Transient { .. } => ErrorCategory::Network,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::InvalidInput { .. } => ErrorCategory::UserInput,
            Self::Config { .. } => ErrorCategory::Configuration,
            Self::Storage { .. } | Self::Io { .. } => ErrorCategory::Storage,
            Self::Cancelled => ErrorCategory::Cancellation,
            Self::Http { .. } | Self::ForeignOrigin { .. } | Self::Json { .. } => {
                ErrorCategory::Internal
            }
        }
    }

    /// The single normalized string a view displays
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials { message } => message
                .clone()
                .unwrap_or_else(|| "Invalid email or password".to_string()),
            Self::InvalidCode { message } => message
                .clone()
                .unwrap_or_else(|| "Invalid or expired verification code".to_string()),
            Self::RefreshFailed { .. } | Self::NotAuthenticated => {
                "Your session has expired. Please log in again.".to_string()
            }
            Self::ExpiredAccessToken { message }
            | Self::Transient { message, .. }
            | Self::Validation { message, .. }
            | Self::Http { message, .. }
            | Self::InvalidInput { message, .. } => message.clone(),
            Self::Cancelled => "Request was cancelled".to_string(),
            other => other.to_string(),
        }
    }
}
