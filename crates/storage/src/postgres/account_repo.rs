//! Account repository implementation for PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;

use tally_core::error::StorageResult;
use tally_core::models::Account;
use tally_core::ports::AccountRepository;

use super::database::Database;
use super::helpers::query_error;

/// PostgreSQL implementation of AccountRepository.
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn find_accounts(&self, ids: &[String]) -> StorageResult<Vec<Account>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, AccountRow>("SELECT id FROM accounts WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(rows.into_iter().map(|row| Account { id: row.id }).collect())
    }
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: String,
}
