//! The durable store contract.
//!
//! The engine holds no locks of its own. Every consume and confirm is a
//! single call to [`DurableStore::try_transition`], and the store is
//! responsible for making that call indivisible per id.

use crate::domain::{Secret, SecretId, SecretState};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Authoritative persistence for secrets.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Persist a new secret. A duplicate id is a persistence error.
    async fn insert(&self, secret: &Secret) -> Result<()>;

    /// Atomically move `id` from `from` to `to` and return the row as it was
    /// before the move.
    ///
    /// Returns `None` when the row is absent or not in `from`. A row that is
    /// expired at `now` is deleted and `None` is returned. Otherwise:
    ///
    /// | from → to | effect |
    /// |-----------|--------|
    /// | `Active → Consumed` | row deleted |
    /// | `Active → Delivered` | state updated, content kept |
    /// | `Delivered → Consumed` | state updated, content cleared |
    /// | `X → X` | no change |
    async fn try_transition(
        &self,
        id: &SecretId,
        from: SecretState,
        to: SecretState,
        now: DateTime<Utc>,
    ) -> Result<Option<Secret>>;

    /// Delete up to `limit` rows whose expiry is at or before `before`,
    /// regardless of state. Returns the number of rows deleted.
    async fn delete_expired_before(&self, before: DateTime<Utc>, limit: u32) -> Result<u64>;
}

/// What a non-expired transition does to the stored row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransitionEffect {
    Delete,
    UpdateState,
    ClearContent,
    Unchanged,
}

impl TransitionEffect {
    pub(crate) fn of(from: SecretState, to: SecretState) -> Self {
        match (from, to) {
            (f, t) if f == t => TransitionEffect::Unchanged,
            (SecretState::Active, SecretState::Consumed) => TransitionEffect::Delete,
            (_, SecretState::Consumed) => TransitionEffect::ClearContent,
            _ => TransitionEffect::UpdateState,
        }
    }
}
