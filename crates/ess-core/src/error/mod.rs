//! Error types for the ESS portal client
//!
//! Every failure that reaches a view is an [`EssError`]. Backend error
//! envelopes are normalized into one human-readable string before they get
//! here, so callers only ever need [`EssError::user_message`].

mod codes;
mod constructors;
mod conversions;
mod types;
mod user_messages;

pub use types::{EssError, EssResult, OptionExt};
pub use user_messages::ErrorCategory;
