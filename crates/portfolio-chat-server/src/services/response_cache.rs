use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::CacheConfig;
use crate::models::chat::ChatMode;
use crate::utils::fingerprint;

struct CacheEntry {
    value: String,
    created_at: Instant,
}

/// Generated replies keyed by a fingerprint of the normalized query.
///
/// Entries expire `ttl` after insertion (reads never extend them). When an
/// insert pushes the map over `max_entries`, the single oldest entry is
/// evicted under the same lock, so concurrent inserts never over-evict.
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.max_entries)
    }

    /// `fingerprint(lowercase(trim(message)) + ":" + mode)`
    pub fn key(message: &str, mode: ChatMode) -> String {
        let normalized = message.trim().to_lowercase();
        fingerprint(&format!("{}:{}", normalized, mode.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &str, now: Instant) -> Option<String> {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;

        if now.saturating_duration_since(entry.created_at) < self.ttl {
            return Some(entry.value.clone());
        }

        entries.remove(key);
        debug!("Response cache entry {} expired, removed", short(key));
        None
    }

    pub fn put(&self, key: String, value: String) {
        self.put_at(key, value, Instant::now());
    }

    pub fn put_at(&self, key: String, value: String, created_at: Instant) {
        let mut entries = self.entries.lock();
        entries.insert(key, CacheEntry { value, created_at });

        if entries.len() > self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone());
            if let Some(k) = oldest {
                entries.remove(&k);
                debug!("Response cache full, evicted {}", short(&k));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn stats(&self) -> ResponseCacheStats {
        ResponseCacheStats {
            entries: self.len(),
            max_entries: self.max_entries,
            ttl_seconds: self.ttl.as_secs(),
        }
    }
}

fn short(key: &str) -> &str {
    key.get(..12).unwrap_or(key)
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseCacheStats {
    pub entries: usize,
    pub max_entries: usize,
    pub ttl_seconds: u64,
}
