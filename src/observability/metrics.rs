//! # Metrics Collection
//!
//! Lifecycle counters for the engine, with an optional Prometheus exporter.

use crate::config::ObservabilityConfig;
use crate::errors::{BurnnoteError, Result};
use ::tracing::{info, warn};
use metrics::{counter, describe_counter, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub const SECRETS_CREATED: &str = "burnnote_secrets_created_total";
pub const SECRETS_DELIVERED: &str = "burnnote_secrets_delivered_total";
pub const CONSUME_NOT_FOUND: &str = "burnnote_consume_not_found_total";
pub const SECRETS_CONFIRMED: &str = "burnnote_secrets_confirmed_total";
pub const SECRETS_SWEPT: &str = "burnnote_secrets_swept_total";
pub const CACHE_ERRORS: &str = "burnnote_cache_errors_total";

/// Register metric descriptions with the installed recorder
pub fn describe_metrics() {
    describe_counter!(SECRETS_CREATED, Unit::Count, "Secrets durably stored");
    describe_counter!(SECRETS_DELIVERED, Unit::Count, "Successful one-time deliveries");
    describe_counter!(
        CONSUME_NOT_FOUND,
        Unit::Count,
        "Consume calls for unknown, consumed or expired secrets"
    );
    describe_counter!(SECRETS_CONFIRMED, Unit::Count, "Two-phase confirmations");
    describe_counter!(SECRETS_SWEPT, Unit::Count, "Expired rows removed by the sweep");
    describe_counter!(CACHE_ERRORS, Unit::Count, "Swallowed accelerator cache failures");
}

/// Install the Prometheus exporter when a metrics port is configured
pub fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    let metrics_addr = match config.metrics_bind_address() {
        Some(addr) => addr,
        None => {
            warn!("Metrics exporter disabled: no metrics port configured");
            return Ok(());
        }
    };

    let socket_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
        BurnnoteError::config(format!("Invalid metrics bind address '{}': {}", metrics_addr, e))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", &config.service_name)
        .install()
        .map_err(|e| {
            BurnnoteError::config(format!("Failed to initialize metrics exporter: {}", e))
        })?;

    describe_metrics();

    info!(
        metrics_addr = %metrics_addr,
        service_name = %config.service_name,
        "Metrics collection initialized"
    );

    Ok(())
}

pub(crate) fn record_created() {
    counter!(SECRETS_CREATED).increment(1);
}

pub(crate) fn record_delivered(redelivery: bool) {
    let labels = [("redelivery", redelivery.to_string())];
    counter!(SECRETS_DELIVERED, &labels).increment(1);
}

pub(crate) fn record_not_found() {
    counter!(CONSUME_NOT_FOUND).increment(1);
}

pub(crate) fn record_confirmed() {
    counter!(SECRETS_CONFIRMED).increment(1);
}

pub(crate) fn record_swept(count: u64) {
    counter!(SECRETS_SWEPT).increment(count);
}

pub(crate) fn record_cache_error(operation: &'static str) {
    let labels = [("operation", operation)];
    counter!(CACHE_ERRORS, &labels).increment(1);
}
