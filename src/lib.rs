//! ESS portal client
//!
//! Umbrella crate over [`ess_sdk`] (the [`Portal`] context object) and
//! [`ess_core`] (session lifecycle and request pipeline building blocks).

pub use ess_core;
pub use ess_sdk;

pub use ess_sdk::{
    CacheKey, Destination, EssError, EssResult, LoginOutcome, MutationKind, MutationOptions,
    Portal, PortalBuilder, PortalConfig, Resource, Session,
};
