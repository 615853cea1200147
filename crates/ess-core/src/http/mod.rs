//! Authorized HTTP access to the portal backend
//!
//! - [`ApiClient`] attaches the bearer token, refreshes once on 401 and
//!   retries once
//! - [`envelope`] unwraps `{data}` bodies and normalizes error payloads
//! - [`origin`] keeps every request on the configured backend origin
//! - [`sanitize`] keeps tokens out of logs

mod client;
pub mod envelope;
pub mod origin;
pub mod sanitize;


pub use client::{ApiClient, RequestOptions};
pub use envelope::{
    GENERIC_ERROR_MESSAGE, normalize_error_body, normalize_error_bytes, parse_body, unwrap_data,
};
pub use origin::resolve_endpoint;
pub use reqwest::Method;
pub use sanitize::{mask_token, sanitize_error_text};
