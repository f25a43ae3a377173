//! # Configuration Management
//!
//! Layered configuration for the burnnote engine: built-in defaults, an
//! optional TOML file and `BURNNOTE__*` environment variables, validated
//! with the `validator` crate.

pub mod settings;

pub use settings::{
    AppConfig, CacheConfig, DatabaseConfig, EngineConfig, ObservabilityConfig, SweepConfig,
    ENV_PREFIX,
};
