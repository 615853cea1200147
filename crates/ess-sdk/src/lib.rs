//! ESS Portal SDK
//!
//! [`Portal`] wires the session store, refresh guard, request client,
//! mutation pipeline and view cache together once, so there is exactly one
//! session and one in-flight refresh per portal.
//!
//! # Example
//!
//! ```no_run
//! use ess_sdk::{LoginOutcome, Portal, PortalConfig, Resource};
//!
//! # async fn example() -> Result<(), ess_sdk::EssError> {
//! let portal = Portal::new(PortalConfig::new("https://hr.example.com"))?;
//!
//! match portal.login("ada@example.com", "correct horse").await? {
//!     LoginOutcome::Authenticated(login) => println!("-> {:?}", login.destination),
//!     LoginOutcome::RequiresSecondFactor(pending) => {
//!         portal.verify_code(&pending, "123456").await?;
//!     }
//! }
//!
//! let payslips = portal.view(Resource::Payslips.into()).await?;
//! println!("{}", payslips);
//! # Ok(())
//! # }
//! ```

pub mod portal;

pub use portal::{Portal, PortalBuilder};

// Re-export commonly used types from core
pub use ess_core::{
    attachment::Attachment,
    attendance::{ClockStatus, TierView},
    auth::{AuthenticatedLogin, LoginOutcome, PendingVerification, Session, UserProfile},
    cache::{CacheKey, EntryStatus, Resource},
    config::PortalConfig,
    error::{EssError, EssResult},
    mutation::{MutationKind, MutationOptions},
    navigation::Destination,
};

