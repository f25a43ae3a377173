//! # Storage and Persistence
//!
//! The [`DurableStore`] contract with its PostgreSQL and in-memory
//! implementations, plus pool and migration management.

pub mod memory;
pub mod migrations;
pub mod pool;
pub mod repositories;
pub mod store;

pub use crate::config::DatabaseConfig;

pub use memory::InMemorySecretStore;
pub use migrations::{list_applied_migrations, validate_migrations, MigrationInfo};
pub use pool::{create_pool, get_pool_stats, DbPool, PoolStats};
pub use repositories::PgSecretStore;
pub use store::DurableStore;

use crate::errors::{BurnnoteError, Result};

/// Run database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    migrations::run_migrations(pool).await
}

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| BurnnoteError::database(e, "Database connectivity check failed"))?;

    Ok(())
}
