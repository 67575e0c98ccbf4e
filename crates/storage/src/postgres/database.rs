//! PostgreSQL database connection and configuration.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, instrument};

use tally_core::error::{StorageError, StorageResult};

use super::helpers::query_error;

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections to maintain.
    pub min_connections: u32,
    /// Connection acquisition timeout.
    pub acquire_timeout: Duration,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
    /// Maximum connection lifetime.
    pub max_lifetime: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/tally".to_string(),
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl DatabaseConfig {
    /// Create a configuration sized for the indexer.
    ///
    /// Batches are committed one at a time, so a small pool is enough.
    pub fn for_indexer(url: &str) -> Self {
        Self {
            url: url.to_string(),
            max_connections: 5,
            min_connections: 1,
            ..Default::default()
        }
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to the database with the given configuration.
    #[instrument(skip_all)]
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        debug!(
            max_conn = config.max_connections,
            min_conn = config.min_connections,
            "Creating connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .max_lifetime(Some(config.max_lifetime))
            .connect(&config.url)
            .await
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;

        debug!("Connection pool created");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> StorageResult<()> {
        debug!("Running migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::MigrationError(e.to_string()))?;

        debug!("Migrations completed");

        Ok(())
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Purge all indexed data from the database.
    ///
    /// Removes every transfer and account and resets the cursor, keeping the
    /// schema and migration history. Indexing then restarts from scratch.
    #[instrument(skip(self))]
    pub async fn purge(&self) -> StorageResult<PurgeStats> {
        debug!("Starting database purge");

        let transfer_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transfers")
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)?;

        let account_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)?;

        sqlx::query("TRUNCATE transfers, accounts, indexer_cursor")
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        debug!("Database purge completed");

        Ok(PurgeStats {
            transfers_removed: transfer_count.0 as u64,
            accounts_removed: account_count.0 as u64,
        })
    }
}

/// Statistics from a database purge operation.
#[derive(Debug, Clone)]
pub struct PurgeStats {
    /// Number of transfers removed.
    pub transfers_removed: u64,
    /// Number of accounts removed.
    pub accounts_removed: u64,
}
