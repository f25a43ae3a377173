//! # Error Handling
//!
//! Error types shared by the engine, the durable stores and configuration
//! loading. Accelerator cache failures use their own type
//! ([`crate::cache::CacheError`]) and never surface through here.

pub mod types;

pub use types::{BurnnoteError, ErrorContext, Result};
