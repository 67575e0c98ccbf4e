//! PostgreSQL storage adapter.
//!
//! This module implements the repository traits defined in `tally-core`
//! using PostgreSQL as the backing store.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool and migrations
//! - [`PgRepositories`] - Composite repository implementing `Repositories` trait
//! - [`PgAccountRepository`] - Account lookups
//!
//! The cursor is a single row per chain, read directly by [`PgRepositories`].

mod account_repo;
mod database;
mod helpers;

pub use account_repo::PgAccountRepository;
pub use database::{Database, DatabaseConfig, PurgeStats};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use tally_core::error::{StorageError, StorageResult};
use tally_core::ports::{AccountRepository, BatchData, CursorRepository, Repositories};

use helpers::{block_height, numeric, query_error};

// =============================================================================
// Composite Repository
// =============================================================================

/// Aggregated PostgreSQL repositories implementing the `Repositories` trait.
///
/// This provides a single entry point for all storage operations and
/// implements the batch write as one transaction.
pub struct PgRepositories {
    db: Arc<Database>,
    accounts: PgAccountRepository,
}

impl PgRepositories {
    /// Create a new repository aggregate from a database connection.
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            accounts: PgAccountRepository::new(&db),
            db,
        }
    }
}

#[async_trait]
impl CursorRepository for PgRepositories {
    async fn bound_chain(&self) -> StorageResult<Option<String>> {
        // The first chain indexed owns the store
        sqlx::query_scalar::<_, String>("SELECT chain_id FROM indexer_cursor ORDER BY updated_at LIMIT 1")
            .fetch_optional(self.db.pool())
            .await
            .map_err(query_error)
    }

    async fn last_indexed_block(&self, chain_id: &str) -> StorageResult<Option<u64>> {
        let height: Option<i64> = sqlx::query_scalar(
            "SELECT last_indexed_block FROM indexer_cursor WHERE chain_id = $1",
        )
        .bind(chain_id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(query_error)?;

        height.map(block_height).transpose()
    }
}

#[async_trait]
impl Repositories for PgRepositories {
    fn accounts(&self) -> &dyn AccountRepository {
        &self.accounts
    }

    fn cursor(&self) -> &dyn CursorRepository {
        self
    }

    async fn persist_batch_atomic(&self, data: BatchData<'_>) -> StorageResult<()> {
        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        // Accounts first so the transfer foreign keys resolve
        let ids: Vec<&str> = data.accounts.iter().map(|a| a.id.as_str()).collect();
        let inserted = sqlx::query(
            r#"
            INSERT INTO accounts (id)
            SELECT * FROM UNNEST($1::TEXT[])
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&ids)
        .execute(&mut *tx)
        .await
        .map_err(query_error)?
        .rows_affected();

        for transfer in data.transfers {
            sqlx::query(
                r#"
                INSERT INTO transfers (
                    id, block_number, block_hash, timestamp, extrinsic_hash,
                    from_id, to_id, amount, fee, kind, remark, vesting_duration_blocks
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8::NUMERIC, $9::NUMERIC, $10, $11, $12::NUMERIC)
                "#,
            )
            .bind(&transfer.id)
            .bind(transfer.block_number as i64)
            .bind(&transfer.block_hash.0[..])
            .bind(transfer.timestamp)
            .bind(transfer.extrinsic_hash.as_ref().map(|h| &h.0[..]))
            .bind(&transfer.from.id)
            .bind(&transfer.to.id)
            .bind(numeric(transfer.amount))
            .bind(transfer.fee.map(numeric))
            .bind(transfer.kind.as_str())
            .bind(&transfer.remark)
            .bind(transfer.vesting_duration_blocks.map(|d| d.to_string()))
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;
        }

        sqlx::query(
            r#"
            INSERT INTO indexer_cursor (chain_id, last_indexed_block, last_indexed_hash, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (chain_id) DO UPDATE SET
                last_indexed_block = EXCLUDED.last_indexed_block,
                last_indexed_hash = EXCLUDED.last_indexed_hash,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&data.cursor.chain_id)
        .bind(data.cursor.last_indexed_block as i64)
        .bind(&data.cursor.last_indexed_hash.0[..])
        .bind(data.cursor.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

        tx.commit()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        debug!(
            accounts = inserted,
            transfers = data.transfers.len(),
            block = data.cursor.last_indexed_block,
            "Batch committed"
        );

        Ok(())
    }
}
