//! # Repository Implementations
//!
//! Database-backed implementations of the storage traits.

pub mod secret;

pub use secret::PgSecretStore;
