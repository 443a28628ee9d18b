use crate::config::AppConfig;
use anyhow::Context;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::info;

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Establishes the connection pool from application configuration.
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> anyhow::Result<DbPool> {
    let mut opt = ConnectOptions::new(cfg.database_url.clone());
    opt.max_connections(cfg.db_max_connections)
        .min_connections(cfg.db_min_connections)
        .connect_timeout(Duration::from_secs(cfg.db_connect_timeout_secs))
        .idle_timeout(Duration::from_secs(cfg.db_idle_timeout_secs))
        .acquire_timeout(Duration::from_secs(cfg.db_acquire_timeout_secs))
        .sqlx_logging(cfg.is_development());

    let pool = Database::connect(opt)
        .await
        .context("failed to connect to database")?;

    info!("Database connection established");
    Ok(pool)
}

/// Runs pending migrations.
pub async fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    info!("Running database migrations");
    crate::migrator::Migrator::up(pool, None)
        .await
        .context("failed to run migrations")?;
    info!("Migrations completed successfully");
    Ok(())
}
