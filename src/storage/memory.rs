//! Process-local [`DurableStore`] backed by a `DashMap`.
//!
//! Each transition runs while holding the map's entry lock for that id, so
//! concurrent transitions on one id are serialized and distinct ids proceed
//! in parallel. Contents do not survive a restart.

use crate::domain::{Secret, SecretContent, SecretId, SecretState};
use crate::errors::{BurnnoteError, Result};
use crate::storage::store::{DurableStore, TransitionEffect};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::instrument;

#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: DashMap<SecretId, Secret>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, tombstones included
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Current state of a row without transitioning it
    pub fn state_of(&self, id: &SecretId) -> Option<SecretState> {
        self.secrets.get(id).map(|entry| entry.state)
    }
}

#[async_trait]
impl DurableStore for InMemorySecretStore {
    #[instrument(skip(self, secret), fields(secret_id = %secret.id), name = "mem_insert_secret")]
    async fn insert(&self, secret: &Secret) -> Result<()> {
        match self.secrets.entry(secret.id.clone()) {
            Entry::Occupied(_) => Err(BurnnoteError::persistence(format!(
                "Secret with id '{}' already exists",
                secret.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(secret.clone());
                Ok(())
            }
        }
    }

    #[instrument(skip(self), fields(secret_id = %id), name = "mem_try_transition")]
    async fn try_transition(
        &self,
        id: &SecretId,
        from: SecretState,
        to: SecretState,
        now: DateTime<Utc>,
    ) -> Result<Option<Secret>> {
        let Entry::Occupied(mut entry) = self.secrets.entry(id.clone()) else {
            return Ok(None);
        };

        if entry.get().state != from {
            return Ok(None);
        }

        if entry.get().is_expired(now) {
            entry.remove();
            tracing::debug!("Expired secret removed during transition");
            return Ok(None);
        }

        let prior = entry.get().clone();
        match TransitionEffect::of(from, to) {
            TransitionEffect::Delete => {
                entry.remove();
            }
            TransitionEffect::UpdateState => {
                entry.get_mut().state = to;
            }
            TransitionEffect::ClearContent => {
                let row = entry.get_mut();
                row.state = to;
                row.content = SecretContent::cleared();
            }
            TransitionEffect::Unchanged => {}
        }

        Ok(Some(prior))
    }

    #[instrument(skip(self), name = "mem_delete_expired_before")]
    async fn delete_expired_before(&self, before: DateTime<Utc>, limit: u32) -> Result<u64> {
        let expired: Vec<SecretId> = self
            .secrets
            .iter()
            .filter(|entry| entry.is_expired(before))
            .take(limit as usize)
            .map(|entry| entry.key().clone())
            .collect();

        let mut deleted = 0;
        for id in expired {
            // Re-check under the entry lock in case a transition raced the scan
            if self.secrets.remove_if(&id, |_, secret| secret.is_expired(before)).is_some() {
                deleted += 1;
            }
        }

        Ok(deleted)
    }
}
