//! In-memory view cache

use super::types::{CacheKey, CacheStatistics, EntryStatus, Resource};
use crate::error::EssResult;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;

#[derive(Debug)]
struct Entry {
    value: Option<Value>,
    status: EntryStatus,
    generation: u64,
    fetched_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn empty() -> Self {
        Self {
            value: None,
            status: EntryStatus::Stale,
            generation: 0,
            fetched_at: None,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<CacheKey, Entry>,
    /// Bumped by `clear`; fetches from an older epoch are dropped
    epoch: u64,
    hits: u64,
    misses: u64,
    invalidations: u64,
}

/// Cache of server views keyed by [`CacheKey`].
///
/// Concurrent reads of the same missing key are not deduplicated; each
/// fetches and the last to finish wins.
#[derive(Debug, Default)]
pub struct ViewCache {
    state: Mutex<State>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value if fresh, otherwise run `fetch` and cache it
    pub async fn read<F, Fut>(&self, key: CacheKey, fetch: F) -> EssResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = EssResult<Value>>,
    {
        let (generation, epoch) = {
            let mut state = self.state.lock();
            if let Some(Entry {
                status: EntryStatus::Fresh,
                value: Some(value),
                ..
            }) = state.entries.get(&key)
            {
                let value = value.clone();
                state.hits += 1;
                tracing::trace!(key = %key, "view cache hit");
                return Ok(value);
            }

            state.misses += 1;
            let epoch = state.epoch;
            let entry = state.entries.entry(key.clone()).or_insert_with(Entry::empty);
            entry.status = EntryStatus::Fetching;
            (entry.generation, epoch)
        };

        tracing::debug!(key = %key, "fetching view");
        let result = fetch().await;

        let mut state = self.state.lock();
        if state.epoch != epoch {
            tracing::debug!(key = %key, "cache cleared during fetch; result not stored");
            return result;
        }

        let entry = state.entries.entry(key.clone()).or_insert_with(Entry::empty);
        match &result {
            Ok(value) => {
                entry.value = Some(value.clone());
                entry.fetched_at = Some(Utc::now());
                entry.status = if entry.generation == generation {
                    EntryStatus::Fresh
                } else {
                    tracing::debug!(key = %key, "invalidated during fetch; stored as stale");
                    EntryStatus::Stale
                };
            }
            Err(_) => entry.status = EntryStatus::Stale,
        }
        result
    }

    /// Typed [`read`](Self::read)
    pub async fn read_as<T, F, Fut>(&self, key: CacheKey, fetch: F) -> EssResult<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = EssResult<Value>>,
    {
        let value = self.read(key, fetch).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Mark every entry of `resource` stale; returns how many were touched
    pub fn invalidate(&self, resource: Resource) -> usize {
        let mut state = self.state.lock();
        let mut touched = 0;
        for (_, entry) in state
            .entries
            .iter_mut()
            .filter(|(key, _)| key.resource == resource)
        {
            entry.generation += 1;
            entry.status = EntryStatus::Stale;
            touched += 1;
        }

        if touched == 0 {
            tracing::debug!(resource = %resource, "no view registered; invalidation is a no-op");
        } else {
            state.invalidations += 1;
            tracing::debug!(resource = %resource, entries = touched, "invalidated");
        }
        touched
    }

    /// Mark a single entry stale
    pub fn invalidate_key(&self, key: &CacheKey) -> bool {
        let mut state = self.state.lock();
        let Some(entry) = state.entries.get_mut(key) else {
            tracing::debug!(key = %key, "no view registered; invalidation is a no-op");
            return false;
        };
        entry.generation += 1;
        entry.status = EntryStatus::Stale;
        state.invalidations += 1;
        true
    }

    pub fn status(&self, key: &CacheKey) -> Option<EntryStatus> {
        self.state.lock().entries.get(key).map(|entry| entry.status)
    }

    /// Cached value regardless of status, without fetching
    pub fn peek(&self, key: &CacheKey) -> Option<Value> {
        self.state
            .lock()
            .entries
            .get(key)
            .and_then(|entry| entry.value.clone())
    }

    /// When `key` was last fetched successfully
    pub fn fetched_at(&self, key: &CacheKey) -> Option<DateTime<Utc>> {
        self.state
            .lock()
            .entries
            .get(key)
            .and_then(|entry| entry.fetched_at)
    }

    /// Drop everything; in-flight fetches will not repopulate
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        state.epoch += 1;
        tracing::debug!(entries = dropped, "view cache cleared");
    }

    /// Resources with at least one entry
    pub fn registered_resources(&self) -> Vec<Resource> {
        let state = self.state.lock();
        let set: BTreeSet<Resource> = state.entries.keys().map(|key| key.resource).collect();
        set.into_iter().collect()
    }

    pub fn statistics(&self) -> CacheStatistics {
        let state = self.state.lock();
        let mut stats = CacheStatistics {
            entries: state.entries.len(),
            hits: state.hits,
            misses: state.misses,
            invalidations: state.invalidations,
            ..Default::default()
        };
        for entry in state.entries.values() {
            match entry.status {
                EntryStatus::Fresh => stats.fresh += 1,
                EntryStatus::Stale => stats.stale += 1,
                EntryStatus::Fetching => stats.fetching += 1,
            }
        }
        stats
    }
}
