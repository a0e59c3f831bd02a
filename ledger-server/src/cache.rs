//! Time-to-live cache over durable storage.
//!
//! Every entry records when it was fetched. An entry is served only while
//! `now < fetched_at + ttl`; expired and absent entries look the same to
//! callers. Reads never fail: unreadable or undecodable entries are misses.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::Clock;
use crate::store::{KvStore, StoreError};

/// Default validity window: 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Store key for the catalog-wide line list.
pub const LINES_KEY: &str = "cached_lines";

/// Store key prefix for per-line stop sets.
const STOPS_KEY_PREFIX: &str = "cached_stops";

/// Store key for the stops of one line.
pub fn stops_key(line_slug: &str) -> String {
    format!("{STOPS_KEY_PREFIX}_{line_slug}")
}

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry stays valid after it was fetched.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}

/// Errors from cache writes.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The durable store rejected the operation
    #[error("cache storage error: {0}")]
    Store(#[from] StoreError),

    /// The payload could not be serialized
    #[error("cache encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A cached payload and the instant it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub fetched_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Whether the entry is still valid at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        self.fetched_at
            .checked_add_signed(ttl)
            .is_none_or(|expires_at| now < expires_at)
    }
}

/// Keyed TTL cache.
///
/// Cheap to share: the store and clock are reference-counted, and all
/// operations take `&self`.
pub struct TtlCache {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
}

impl TtlCache {
    /// Create a cache over `store`, reading time from `clock`.
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, config: &CacheConfig) -> Self {
        let ttl = chrono::Duration::from_std(config.ttl).unwrap_or(chrono::Duration::MAX);
        Self { store, clock, ttl }
    }

    /// Return the payload under `key` if present and still valid.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.store.get(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                debug!(key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key, error = %e, "cache entry undecodable, treating as miss");
                return None;
            }
        };

        if entry.is_valid_at(self.clock.now(), self.ttl) {
            Some(entry.data)
        } else {
            debug!(key, fetched_at = %entry.fetched_at, "cache entry expired");
            None
        }
    }

    /// Store `payload` under `key`, stamped with the current time.
    pub fn put<T: Serialize>(&self, key: &str, payload: &T) -> Result<(), CacheError> {
        let entry = CacheEntry {
            data: payload,
            fetched_at: self.clock.now(),
        };
        let bytes = serde_json::to_vec(&entry)?;
        self.store.put(key, &bytes)?;
        Ok(())
    }

    /// Drop every entry, lines and all per-line stops alike.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.store.clear()?;
        Ok(())
    }
}
