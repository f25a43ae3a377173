//! # Observability Infrastructure
//!
//! Structured logging and lifecycle metrics for the burnnote engine.

pub mod logging;
pub mod metrics;

pub use self::logging::{init_logging, log_config_info};
pub use self::metrics::{describe_metrics, init_metrics};

use crate::config::ObservabilityConfig;
use crate::errors::Result;

/// Initialize logging, then metrics
pub fn init_observability(config: &ObservabilityConfig) -> Result<()> {
    init_logging(config)?;
    init_metrics(config)?;

    ::tracing::info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        json_logging = config.json_logging,
        metrics_port = config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}
