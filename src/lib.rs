//! # burnnote
//!
//! One-time secret storage. A secret can be retrieved successfully at most
//! once and is destroyed by that retrieval; unread secrets expire after a
//! time-to-live.
//!
//! ## Architecture
//!
//! ```text
//! caller → SecretEngine → DurableStore (authoritative)
//!                      ↘ AcceleratorCache (optional, fire-and-forget)
//! ```
//!
//! - **Secret Engine**: create, atomic consume, optional two-phase confirm, sweep
//! - **Durable Store**: PostgreSQL via SQLx, or process-local for tests
//! - **Accelerator Cache**: best-effort, never consulted for delivery
//! - **Clock**: injectable wall time for expiry decisions
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use burnnote::{EngineConfig, InMemorySecretStore, SecretEngine};
//! use std::sync::Arc;
//!
//! # async fn demo() -> burnnote::Result<()> {
//! let engine = SecretEngine::new(Arc::new(InMemorySecretStore::new()), EngineConfig::default())?;
//!
//! let id = engine.create("correct horse battery staple", None).await?;
//! assert!(engine.consume(&id).await?.is_some());
//! assert!(engine.consume(&id).await?.is_none());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod observability;
pub mod storage;

pub use cache::{AcceleratorCache, CacheDispatcher, CacheError, MemoryCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, EngineConfig};
pub use domain::{Secret, SecretContent, SecretId, SecretState};
pub use engine::{ConfirmOutcome, ConsumeMode, Redelivery, SecretEngine};
pub use errors::{BurnnoteError, Result};
pub use storage::{DurableStore, InMemorySecretStore, PgSecretStore};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
