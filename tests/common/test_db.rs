//! PostgreSQL test databases backed by Testcontainers.
//!
//! Each `TestDatabase` starts a fresh PostgreSQL container with all
//! migrations applied, so tests never share rows.

use burnnote::config::DatabaseConfig;
use burnnote::storage::{create_pool, DbPool};
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

/// A test database; the container is stopped and removed on drop.
///
/// Keep this struct alive for the duration of the test.
pub struct TestDatabase {
    pub pool: DbPool,
    pub url: String,
    _container: ContainerAsync<Postgres>,
}

impl TestDatabase {
    /// Start a container, connect, and run migrations.
    ///
    /// `prefix` only appears in panic messages.
    pub async fn new(prefix: &str) -> Self {
        let container = Postgres::default().start().await.unwrap_or_else(|e| {
            panic!("Failed to start PostgreSQL container for {}: {}", prefix, e)
        });

        let host = container
            .get_host()
            .await
            .unwrap_or_else(|e| panic!("Failed to get container host for {}: {}", prefix, e));

        let port = container
            .get_host_port_ipv4(5432)
            .await
            .unwrap_or_else(|e| panic!("Failed to get container port for {}: {}", prefix, e));

        let url = format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

        let config = DatabaseConfig {
            url: url.clone(),
            auto_migrate: true,
            max_connections: 20,
            min_connections: 1,
            ..Default::default()
        };

        let pool = create_pool(&config)
            .await
            .unwrap_or_else(|e| panic!("Failed to create test pool for {}: {}", prefix, e));

        Self { pool, url, _container: container }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}
