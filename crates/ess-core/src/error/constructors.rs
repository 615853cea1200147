//! Constructor methods for EssError

use super::types::EssError;
use crate::http::GENERIC_ERROR_MESSAGE;

impl EssError {
    /// Create an invalid-credentials error carrying the backend's message
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::InvalidCredentials {
            message: Some(message.into()),
        }
    }

    /// Create an invalid-code error carrying the backend's message
    pub fn invalid_code(message: impl Into<String>) -> Self {
        Self::InvalidCode {
            message: Some(message.into()),
        }
    }

    /// Create a refresh failure
    pub fn refresh_failed(message: impl Into<String>) -> Self {
        Self::RefreshFailed {
            message: message.into(),
        }
    }

    /// Create a transient error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            status_code: None,
        }
    }

    /// Transient error with the generic fallback message
    pub fn network() -> Self {
        Self::transient(GENERIC_ERROR_MESSAGE)
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>, status_code: u16) -> Self {
        Self::Validation {
            message: message.into(),
            status_code,
        }
    }

    /// Create a new invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid input error with field
    pub fn invalid_input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with context
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a new IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: None,
        }
    }

    /// Create an IO error with path
    pub fn io_with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Create a new JSON error
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json {
            message: message.into(),
        }
    }

    /// Map a non-success, non-401 HTTP status and its normalized message
    /// onto the error taxonomy.
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            400 | 409 | 422 => Self::Validation {
                message,
                status_code,
            },
            408 | 429 | 500..=599 => Self::Transient {
                message,
                status_code: Some(status_code),
            },
            _ => Self::Http {
                message,
                status_code: Some(status_code),
            },
        }
    }
}
