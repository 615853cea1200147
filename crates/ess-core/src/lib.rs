//! ESS Portal Core Library
//!
//! Session and token lifecycle plus the authenticated request pipeline of an
//! employee self-service portal client: credential login, session store,
//! silent refresh, authorized requests, and writes that invalidate the view
//! cache only when they succeed.

pub mod attachment;
pub mod attendance;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod mutation;
pub mod navigation;
pub mod notify;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use attachment::Attachment;
pub use attendance::{AttendanceTracker, ClockStatus, TierView, Tiered};
pub use auth::{
    AuthBackend, AuthenticatedLogin, CredentialExchange, ExpirySemantics, HttpAuthBackend,
    LoginOutcome, PendingVerification, RefreshGuard, RefreshPolicy, SealedFileStore, Session,
    SessionPersistence, SessionStore, TokenSet, UserProfile,
};
pub use cache::{CacheKey, EntryStatus, Resource, ViewCache};
pub use config::{PortalConfig, load_config};
pub use error::{ErrorCategory, EssError, EssResult};
pub use http::{ApiClient, Method, RequestOptions};
pub use mutation::{MutationKind, MutationOptions, MutationPipeline};
pub use navigation::{Destination, Navigator, WatchNavigator};
pub use notify::{ChannelNotifier, Notification, Notifier, TracingNotifier};
