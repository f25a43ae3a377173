//! # Structured Logging
//!
//! Subscriber setup and span macros built on the tracing ecosystem.
//!
//! Secret content is never recorded: spans carry the secret id only.

use crate::config::{AppConfig, ObservabilityConfig};
use crate::errors::{BurnnoteError, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Create a tracing span for durable store operations.
///
/// ```rust,ignore
/// let span = db_span!("try_transition", secret_id = %id);
/// ```
#[macro_export]
macro_rules! db_span {
    ($operation:expr) => {
        tracing::debug_span!(
            "db_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "db_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `log_level`. Returns an error if a
/// global subscriber is already installed.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| {
            BurnnoteError::config(format!("Invalid log level '{}': {}", config.log_level, e))
        })?;

    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json_logging {
        registry.with(fmt::layer().json().with_current_span(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    installed.map_err(|e| {
        BurnnoteError::config(format!("Failed to install tracing subscriber: {}", e))
    })
}

/// Log configuration at startup
pub fn log_config_info(config: &AppConfig) {
    tracing::info!(
        database_url = %crate::storage::pool::sanitize_url(&config.database.url),
        consume_mode = ?config.engine.consume_mode,
        redelivery = ?config.engine.redelivery,
        default_ttl_seconds = config.engine.default_ttl_seconds,
        cache_enabled = config.cache.enabled,
        sweep_enabled = config.sweep.enabled,
        sweep_interval_seconds = config.sweep.interval_seconds,
        "burnnote configuration"
    );
}
