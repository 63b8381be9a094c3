use sqlx::{PgPool, Row};
use std::time::Duration;
use anyhow::{Context, Result};

use crate::core::config::DatabaseConfig as AppDatabaseConfig;

/// Database connection pool for the ABDM integration core.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Creates the connection pool from the app's database config section.
    pub async fn new(config: &AppDatabaseConfig) -> Result<Self> {
        tracing::info!("connecting to PostgreSQL database");

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(3600))
            .test_before_acquire(true)
            .connect(&config.url)
            .await
            .context("failed to create database connection pool")?;

        let version: String = sqlx::query("SELECT version()")
            .fetch_one(&pool)
            .await
            .context("failed to verify database connection")?
            .get(0);

        tracing::info!(%version, "connected to database");

        Ok(Self { pool })
    }

    /// Get database pool for query execution
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs pending migrations against the schema.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("running database migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to run database migrations")?;

        tracing::info!("database migrations completed");
        Ok(())
    }

    /// Health check for database connection
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }

    /// Get database statistics for monitoring
    pub async fn get_stats(&self) -> Result<DatabaseStats> {
        let pool_stats = self.pool.size();
        
        // Get PostgreSQL-specific stats
        let active_connections: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM pg_stat_activity WHERE state = 'active'"
        )
        .fetch_one(&self.pool)
        .await
        .unwrap_or(0);

        let database_size: i64 = sqlx::query_scalar(
            "SELECT pg_database_size(current_database())"
        )
        .fetch_one(&self.pool)
        .await
        .unwrap_or(0);

        Ok(DatabaseStats {
            pool_size: pool_stats,
            active_connections: active_connections as u32,
            database_size_bytes: database_size as u64,
        })
    }

    /// Close database connection pool
    pub async fn close(&self) {
        tracing::info!("Closing database connection pool");
        self.pool.close().await;
    }
}

/// Database connection statistics
#[derive(Debug)]
pub struct DatabaseStats {
    pub pool_size: u32,
    pub active_connections: u32,
    pub database_size_bytes: u64,
}

/// Database transaction wrapper for healthcare operations
pub struct DatabaseTransaction<'a> {
    tx: sqlx::Transaction<'a, sqlx::Postgres>,
}

impl<'a> DatabaseTransaction<'a> {
    /// Begin a new database transaction
    pub async fn begin(db: &'a Database) -> Result<Self> {
        let tx = db.pool.begin().await
            .context("Failed to begin database transaction")?;
        Ok(Self { tx })
    }

    /// Commit the transaction
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await
            .context("Failed to commit database transaction")?;
        Ok(())
    }

    /// Rollback the transaction
    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await
            .context("Failed to rollback database transaction")?;
        Ok(())
    }

    /// Get mutable reference to the transaction
    pub fn as_mut(&mut self) -> &mut sqlx::Transaction<'a, sqlx::Postgres> {
        &mut self.tx
    }
}

