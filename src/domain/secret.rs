//! The secret entity and its lifecycle state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::SecretId;
use crate::errors::{BurnnoteError, Result};

/// Lifecycle state of a stored secret.
///
/// `Delivered` only occurs in two-phase mode. `Consumed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretState {
    Active,
    Delivered,
    Consumed,
}

impl SecretState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretState::Active => "active",
            SecretState::Delivered => "delivered",
            SecretState::Consumed => "consumed",
        }
    }
}

impl Display for SecretState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SecretState {
    type Err = SecretStateParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(SecretState::Active),
            "delivered" => Ok(SecretState::Delivered),
            "consumed" => Ok(SecretState::Consumed),
            other => Err(SecretStateParseError(other.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid secret state: {0}")]
pub struct SecretStateParseError(pub String);

/// Secret payload. Wiped from memory on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretContent(String);

impl SecretContent {
    pub fn new(content: impl Into<String>) -> Self {
        Self(content.into())
    }

    /// Borrow the plaintext
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Blank content, used for consumed tombstones
    pub fn cleared() -> Self {
        Self(String::new())
    }
}

impl fmt::Debug for SecretContent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "SecretContent([REDACTED; {} bytes])", self.0.len())
    }
}

impl PartialEq<str> for SecretContent {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SecretContent {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A stored secret.
#[derive(Debug, Clone)]
pub struct Secret {
    pub id: SecretId,
    pub content: SecretContent,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub state: SecretState,
}

impl Secret {
    /// Build a fresh `Active` secret expiring `ttl` after `now`.
    ///
    /// Pure: id and timestamps come from the caller.
    pub fn new(
        id: SecretId,
        content: SecretContent,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|_| BurnnoteError::validation_field("ttl is out of range", "ttl"))?;
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| BurnnoteError::validation_field("ttl is out of range", "ttl"))?;

        Ok(Self {
            id,
            content,
            created_at: now,
            expires_at: Some(expires_at),
            state: SecretState::Active,
        })
    }

    /// Expired once `expires_at` is reached (the boundary instant counts as expired)
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Time left before expiry, `None` when the secret never expires by time
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at.map(|expires_at| (expires_at - now).to_std().unwrap_or(Duration::ZERO))
    }
}
