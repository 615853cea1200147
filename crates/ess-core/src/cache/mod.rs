//! View cache for server state
//!
//! Entries are keyed by resource plus query parameters and have no TTL: data
//! stays fresh until a successful mutation invalidates it. Invalidation is
//! generation-based, so a fetch that was already in flight when its resource
//! was invalidated lands as stale and the next read fetches again.

mod types;
mod view_cache;


pub use types::{CacheKey, CacheStatistics, EntryStatus, Resource};
pub use view_cache::ViewCache;
