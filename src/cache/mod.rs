//! # Accelerator Cache
//!
//! Optional, non-authoritative cache of secret content keyed by id. The
//! engine only ever writes to it and invalidates it; delivery always goes
//! through the durable store.

pub mod dispatcher;
pub mod memory;

pub use dispatcher::CacheDispatcher;
pub use memory::MemoryCache;

use crate::domain::{SecretContent, SecretId};
use async_trait::async_trait;
use std::time::Duration;

/// Failure reported by a cache backend. Never surfaced to engine callers.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache rejected entry: {0}")]
    Rejected(String),
}

/// Best-effort content cache with per-entry TTL.
#[async_trait]
pub trait AcceleratorCache: Send + Sync {
    async fn set(
        &self,
        id: &SecretId,
        content: &SecretContent,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    async fn invalidate(&self, id: &SecretId) -> Result<(), CacheError>;
}
