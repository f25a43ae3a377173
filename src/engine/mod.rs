//! # Secret Engine
//!
//! Create, one-time consume, optional confirm and expiry sweep on top of a
//! [`DurableStore`]. The store is the only source of delivered content; the
//! accelerator cache is written to and invalidated but never read.

pub mod sweeper;

pub use sweeper::spawn_sweeper;

use crate::cache::CacheDispatcher;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::domain::{Secret, SecretContent, SecretId, SecretState};
use crate::errors::{BurnnoteError, ErrorContext, Result};
use crate::observability::metrics;
use crate::storage::DurableStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// How a successful consume moves the secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumeMode {
    /// `Active → Consumed`; the row is destroyed by the read itself
    #[default]
    Immediate,
    /// `Active → Delivered` on read, `Delivered → Consumed` on confirm
    TwoPhase,
}

/// Whether a delivered but unconfirmed secret is served again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Redelivery {
    #[default]
    Blocked,
    UntilConfirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed,
    NotFound,
}

/// Default batch size for [`SecretEngine::sweep_expired`]
pub const DEFAULT_SWEEP_BATCH_SIZE: u32 = 500;

pub struct SecretEngine {
    store: Arc<dyn DurableStore>,
    cache: CacheDispatcher,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    sweep_batch_size: u32,
}

impl std::fmt::Debug for SecretEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretEngine")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .field("sweep_batch_size", &self.sweep_batch_size)
            .finish_non_exhaustive()
    }
}

impl SecretEngine {
    /// Engine over `store` with the system clock and no cache.
    ///
    /// Fails with a validation error if `config` is inconsistent, for
    /// example a default TTL above the maximum.
    pub fn new(store: Arc<dyn DurableStore>, config: EngineConfig) -> Result<Self> {
        config.ensure_valid()?;

        Ok(Self {
            store,
            cache: CacheDispatcher::disabled(),
            clock: Arc::new(SystemClock),
            config,
            sweep_batch_size: DEFAULT_SWEEP_BATCH_SIZE,
        })
    }

    /// Dispatcher the engine sends cache writes through
    pub fn cache(&self) -> &CacheDispatcher {
        &self.cache
    }

    pub fn with_cache(mut self, cache: CacheDispatcher) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sweep_batch_size(mut self, batch_size: u32) -> Self {
        self.sweep_batch_size = batch_size.max(1);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Store `content` and return its new id.
    ///
    /// `ttl` defaults to the configured default TTL. The secret is durably
    /// stored before this returns; the cache write happens in the background.
    #[instrument(skip(self, content), fields(secret_id = tracing::field::Empty, content_bytes = content.len()))]
    pub async fn create(&self, content: &str, ttl: Option<Duration>) -> Result<SecretId> {
        self.validate_content(content)?;
        let ttl = self.resolve_ttl(ttl)?;

        let id = SecretId::generate();
        tracing::Span::current().record("secret_id", tracing::field::display(&id));

        let secret = Secret::new(id.clone(), SecretContent::new(content), self.clock.now(), ttl)?;

        self.store.insert(&secret).await.context("Failed to store secret")?;

        metrics::record_created();
        info!(ttl_seconds = ttl.as_secs(), "Secret created");

        let Secret { id: stored_id, content, .. } = secret;
        self.cache.spawn_set(stored_id, content, ttl);

        Ok(id)
    }

    /// Deliver the content of `id` at most once.
    ///
    /// `Ok(None)` covers unknown, already consumed and expired ids alike.
    /// Store failures are returned as errors and never reported as `None`.
    #[instrument(skip(self), fields(secret_id = %id, mode = ?self.config.consume_mode))]
    pub async fn consume(&self, id: &SecretId) -> Result<Option<SecretContent>> {
        let now = self.clock.now();

        let to = match self.config.consume_mode {
            ConsumeMode::Immediate => SecretState::Consumed,
            ConsumeMode::TwoPhase => SecretState::Delivered,
        };

        let mut redelivery = false;
        let mut taken = self.store.try_transition(id, SecretState::Active, to, now).await?;

        if taken.is_none()
            && self.config.consume_mode == ConsumeMode::TwoPhase
            && self.config.redelivery == Redelivery::UntilConfirmed
        {
            taken = self
                .store
                .try_transition(id, SecretState::Delivered, SecretState::Delivered, now)
                .await?;
            redelivery = taken.is_some();
        }

        let Some(secret) = taken.filter(|secret| !secret.is_expired(now)) else {
            metrics::record_not_found();
            debug!("Secret not found");
            return Ok(None);
        };

        metrics::record_delivered(redelivery);
        info!(redelivery, "Secret delivered");

        let Secret { id: delivered_id, content, .. } = secret;
        self.cache.spawn_invalidate(delivered_id);

        Ok(Some(content))
    }

    /// Finish a two-phase delivery.
    ///
    /// Repeating a confirm is harmless and reports `Confirmed` again. Ids that
    /// were never delivered, or have expired, report `NotFound`. In immediate
    /// mode there is nothing to confirm and every id reports `NotFound`.
    #[instrument(skip(self), fields(secret_id = %id))]
    pub async fn confirm(&self, id: &SecretId) -> Result<ConfirmOutcome> {
        if self.config.consume_mode == ConsumeMode::Immediate {
            debug!("Confirm ignored: immediate consume mode");
            return Ok(ConfirmOutcome::NotFound);
        }

        let now = self.clock.now();

        if self
            .store
            .try_transition(id, SecretState::Delivered, SecretState::Consumed, now)
            .await?
            .is_some()
        {
            metrics::record_confirmed();
            info!("Secret confirmed");
            self.cache.spawn_invalidate(id.clone());
            return Ok(ConfirmOutcome::Confirmed);
        }

        let already_confirmed = self
            .store
            .try_transition(id, SecretState::Consumed, SecretState::Consumed, now)
            .await?
            .is_some();

        if already_confirmed {
            debug!("Secret already confirmed");
            Ok(ConfirmOutcome::Confirmed)
        } else {
            debug!("Nothing to confirm");
            Ok(ConfirmOutcome::NotFound)
        }
    }

    /// Delete every row that has expired, in batches. Returns the number removed.
    #[instrument(skip(self), fields(batch_size = self.sweep_batch_size))]
    pub async fn sweep_expired(&self) -> Result<u64> {
        let now = self.clock.now();
        let mut total = 0u64;

        loop {
            let deleted = self.store.delete_expired_before(now, self.sweep_batch_size).await?;
            total += deleted;

            if deleted < u64::from(self.sweep_batch_size) {
                break;
            }
        }

        if total > 0 {
            metrics::record_swept(total);
            info!(deleted = total, "Expired secrets swept");
        } else {
            debug!("Sweep found nothing to delete");
        }

        Ok(total)
    }

    /// Wait up to `timeout` for outstanding cache writes.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        info!(timeout_ms = timeout.as_millis(), "Shutting down secret engine");
        self.cache.flush(timeout).await
    }

    fn validate_content(&self, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(BurnnoteError::validation_field("Secret content cannot be empty", "content"));
        }

        if content.len() > self.config.max_content_bytes {
            return Err(BurnnoteError::validation_field(
                format!(
                    "Secret content is {} bytes, the limit is {}",
                    content.len(),
                    self.config.max_content_bytes
                ),
                "content",
            ));
        }

        Ok(())
    }

    fn resolve_ttl(&self, ttl: Option<Duration>) -> Result<Duration> {
        let ttl = ttl.unwrap_or_else(|| self.config.default_ttl());

        if ttl.is_zero() {
            return Err(BurnnoteError::validation_field("ttl must be positive", "ttl"));
        }

        if ttl > self.config.max_ttl() {
            return Err(BurnnoteError::validation_field(
                format!("ttl cannot exceed {} seconds", self.config.max_ttl_seconds),
                "ttl",
            ));
        }

        Ok(ttl)
    }
}
