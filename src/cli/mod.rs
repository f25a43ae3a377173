//! # Command Line Interface
//!
//! Operator commands for the burnnote engine: database management, the
//! create / consume / confirm / sweep operations, and a long-running
//! `serve` mode that runs the expiry sweeper.

pub mod config_cmd;
pub mod output;
pub mod secret_cmd;
pub mod serve;

use crate::cache::{CacheDispatcher, MemoryCache};
use crate::config::{AppConfig, CacheConfig};
use crate::engine::SecretEngine;
use crate::storage::{
    create_pool, list_applied_migrations, run_migrations, validate_migrations, DbPool,
    MigrationInfo, PgSecretStore,
};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "burnnote")]
#[command(about = "One-time secret store with consume-on-read semantics")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database URL override
    #[arg(long, global = true, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the expiry sweeper until interrupted
    Serve,

    /// Database management commands
    Database {
        #[command(subcommand)]
        command: DatabaseCommands,
    },

    #[command(flatten)]
    Secret(secret_cmd::SecretCommands),

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: config_cmd::ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum DatabaseCommands {
    /// Run pending migrations
    Migrate,

    /// Show applied migrations and whether the schema is current
    Status,
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }

    match cli.command {
        Commands::Serve => serve::run(config).await?,
        Commands::Config { command } => config_cmd::handle_config_command(command, &config)?,
        Commands::Database { command } => {
            crate::observability::init_logging(&config.observability)?;
            let pool = create_pool(&config.database).await?;
            handle_database_command(command, &pool).await?;
        }
        Commands::Secret(command) => {
            crate::observability::init_logging(&config.observability)?;
            let pool = create_pool(&config.database).await?;
            let engine = build_engine(&config, pool, EngineHost::OneShot)?;

            let result = secret_cmd::handle_secret_command(command, &engine).await;
            engine.shutdown(config.cache.flush_timeout()).await;
            result?;
        }
    }

    Ok(())
}

/// Lifetime of the process an engine is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineHost {
    /// Runs a single command and exits
    OneShot,
    /// Stays up until shut down
    Server,
}

/// Assemble an engine over the PostgreSQL store from configuration
pub fn build_engine(
    config: &AppConfig,
    pool: DbPool,
    host: EngineHost,
) -> crate::errors::Result<SecretEngine> {
    Ok(SecretEngine::new(Arc::new(PgSecretStore::new(pool)), config.engine.clone())?
        .with_cache(cache_for(&config.cache, host))
        .with_sweep_batch_size(config.sweep.batch_size))
}

/// The in-process cache dies with the process, so one-shot commands skip it
fn cache_for(config: &CacheConfig, host: EngineHost) -> CacheDispatcher {
    match host {
        EngineHost::Server if config.enabled => {
            CacheDispatcher::new(Arc::new(MemoryCache::new(config.max_entries)))
        }
        _ => CacheDispatcher::disabled(),
    }
}

/// Handle database management commands
async fn handle_database_command(command: DatabaseCommands, pool: &DbPool) -> anyhow::Result<()> {
    match command {
        DatabaseCommands::Migrate => {
            println!("Running database migrations...");
            run_migrations(pool).await?;
            println!("Migrations completed successfully!");
        }

        DatabaseCommands::Status => {
            let migrations = list_applied_migrations(pool).await?;
            if migrations.is_empty() {
                println!("No migrations have been applied");
            } else {
                println!("Applied migrations:");
                print_migrations_table(&migrations);
            }

            if validate_migrations(pool).await? {
                println!("Database schema is up to date");
            } else {
                println!("Database schema has pending migrations");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Print migrations in a formatted table
fn print_migrations_table(migrations: &[MigrationInfo]) {
    println!();
    println!("{:<15} {:<40} {:<25} {:<10}", "Version", "Description", "Applied On", "Time (ms)");
    println!("{}", "-".repeat(90));

    for migration in migrations {
        println!(
            "{:<15} {:<40} {:<25} {:<10}",
            migration.version,
            output::truncate_string(&migration.description, 38),
            migration.installed_on.format("%Y-%m-%d %H:%M:%S"),
            migration.execution_time
        );
    }
}
