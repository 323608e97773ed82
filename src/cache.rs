use anyhow::Result;
use dashmap::DashMap;
use std::future::Future;

use log::debug;

/// Write-once metadata cache scoped to one run.
///
/// Keys are stable identifiers (token or coin addresses). The first value
/// stored for a key wins; later writes for the same key are ignored, so
/// concurrent lookups that race on a miss converge on one entry. Negative
/// results (`None`) are cached as well. There is no eviction: the cache lives
/// as long as the run that owns it.
#[derive(Debug)]
pub struct CoinInfoCache<V: Clone> {
    entries: DashMap<String, Option<V>>,
}

impl<V: Clone> CoinInfoCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Cached entry for `key`; the outer `None` means "never looked up".
    pub fn get(&self, key: &str) -> Option<Option<V>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Stores `value` unless `key` already has an entry; returns the stored entry.
    pub fn insert_once(&self, key: &str, value: Option<V>) -> Option<V> {
        self.entries
            .entry(key.to_string())
            .or_insert(value)
            .value()
            .clone()
    }

    /// Cached entry for `key`, running `fetch` on a miss.
    ///
    /// Fetch errors propagate and leave the key uncached.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<Option<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>>>,
    {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        debug!("Metadata cache miss for {}", key);
        let fetched = fetch().await?;
        Ok(self.insert_once(key, fetched))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for CoinInfoCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
