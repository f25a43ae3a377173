//! In-process [`AcceleratorCache`] bounded by entry count.

use super::{AcceleratorCache, CacheError};
use crate::domain::{SecretContent, SecretId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct CacheEntry {
    content: SecretContent,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// DashMap-backed cache.
///
/// When full, expired entries are dropped first, then the entry closest to
/// expiry. Evicted content is zeroized as it is dropped.
#[derive(Debug)]
pub struct MemoryCache {
    entries: DashMap<SecretId, CacheEntry>,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self { entries: DashMap::new(), max_entries: max_entries.max(1) }
    }

    /// Number of entries, including ones past their TTL that have not been evicted yet
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a live entry exists for `id`
    pub fn contains(&self, id: &SecretId) -> bool {
        let now = Instant::now();
        self.entries.get(id).is_some_and(|entry| !entry.is_expired(now))
    }

    fn make_room(&self, now: Instant) {
        self.entries.retain(|_, entry| !entry.is_expired(now));

        while self.entries.len() >= self.max_entries {
            let victim = self
                .entries
                .iter()
                .min_by_key(|entry| entry.expires_at)
                .map(|entry| entry.key().clone());

            match victim {
                Some(id) => {
                    self.entries.remove(&id);
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl AcceleratorCache for MemoryCache {
    async fn set(
        &self,
        id: &SecretId,
        content: &SecretContent,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| CacheError::Rejected(format!("ttl {:?} is out of range", ttl)))?;

        if !self.entries.contains_key(id) && self.entries.len() >= self.max_entries {
            self.make_room(now);
        }

        self.entries.insert(id.clone(), CacheEntry { content: content.clone(), expires_at });
        Ok(())
    }

    async fn invalidate(&self, id: &SecretId) -> Result<(), CacheError> {
        self.entries.remove(id);
        Ok(())
    }
}
