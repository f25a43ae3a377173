//! Long-running mode: keeps the schema current and sweeps expired secrets
//! until Ctrl-C.

use crate::config::AppConfig;
use crate::engine::spawn_sweeper;
use crate::observability::{init_observability, log_config_info};
use crate::storage::{check_connection, create_pool, get_pool_stats};
use crate::{APP_NAME, VERSION};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    init_observability(&config.observability)?;

    info!(app_name = APP_NAME, version = VERSION, "Starting burnnote");
    log_config_info(&config);

    let pool = create_pool(&config.database).await?;
    check_connection(&pool).await?;
    let stats = get_pool_stats(&pool);
    info!(size = stats.size, idle = stats.idle, "Database ready");

    let engine = Arc::new(super::build_engine(&config, pool.clone(), super::EngineHost::Server)?);
    let shutdown = CancellationToken::new();

    let sweeper = if config.sweep.enabled {
        Some(spawn_sweeper(engine.clone(), config.sweep.interval(), shutdown.clone()))
    } else {
        info!("Expiry sweeper disabled");
        None
    };

    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
    shutdown.cancel();

    if let Some(sweeper) = sweeper {
        if let Err(e) = sweeper.await {
            error!(error = %e, "Expiry sweeper task failed");
        }
    }

    engine.shutdown(config.cache.flush_timeout()).await;
    pool.close().await;

    info!("burnnote shutdown completed");
    Ok(())
}
