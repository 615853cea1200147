//! From trait implementations for EssError conversions

use super::types::EssError;

impl From<std::io::Error> for EssError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for EssError {
    fn from(error: serde_json::Error) -> Self {
        Self::json(error.to_string())
    }
}

impl From<url::ParseError> for EssError {
    fn from(error: url::ParseError) -> Self {
        Self::invalid_input(format!("Invalid URL: {}", error))
    }
}

/// Transport failures never leak reqwest's text to views; the detail goes to
/// the log and the caller sees the generic message.
impl From<reqwest::Error> for EssError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return Self::json(error.to_string());
        }
        tracing::debug!(
            timeout = error.is_timeout(),
            connect = error.is_connect(),
            "transport error: {}",
            error
        );
        Self::Transient {
            message: crate::http::GENERIC_ERROR_MESSAGE.to_string(),
            status_code: error.status().map(|s| s.as_u16()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for EssError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::network()
    }
}
