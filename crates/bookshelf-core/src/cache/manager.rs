use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

/// Consider cached responses stale after 5 minutes.
/// Catalog data changes rarely; profile and favorites are invalidated by
/// tag long before the clock matters.
const CACHE_STALE_MINUTES: i64 = 5;

/// Labels attached to cached query results for targeted invalidation.
///
/// A query "provides" the tags its result carries; a mutation
/// "invalidates" tags, dropping every entry that carries one of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    /// The authenticated user's profile
    User,
    /// Catalog listings and recommendations
    Book,
    /// A single catalog entry
    BookId(i64),
    /// The favorites list
    Favorites,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    tags: Vec<Tag>,
    cached_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_stale(&self) -> bool {
        Utc::now() - self.cached_at > Duration::minutes(CACHE_STALE_MINUTES)
    }
}

/// In-memory cache for API query results.
///
/// Values are stored shape-erased as JSON so one cache serves every
/// endpoint. Invalidation is the only cross-request ordering guarantee:
/// a read whose tags were invalidated refetches on next access, but
/// requests already in flight are not cancelled.
#[derive(Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetch a cached value if present and fresh. Stale entries are
    /// dropped on the spot.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_stale() => {
                debug!(key, "Dropping stale cache entry");
                entries.remove(key);
                None
            }
            Some(entry) => serde_json::from_value(entry.value.clone()).ok(),
            None => None,
        }
    }

    /// Store a value under `key`, tagged for later invalidation.
    pub fn put<T: Serialize>(&self, key: &str, value: &T, tags: Vec<Tag>) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                debug!(key, error = %e, "Not caching unserializable value");
                return;
            }
        };
        self.lock().insert(
            key.to_string(),
            CacheEntry {
                value,
                tags,
                cached_at: Utc::now(),
            },
        );
    }

    /// Drop every entry carrying any of the given tags.
    pub fn invalidate(&self, tags: &[Tag]) {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.tags.iter().any(|tag| tags.contains(tag)));
        let dropped = before - entries.len();
        if dropped > 0 {
            debug!(?tags, dropped, "Invalidated cached queries");
        }
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
