//! Port traits for data repositories.
//!
//! These traits define the storage interface used by the domain layer.
//! Implementations live in the infrastructure layer (e.g., `tally-storage`).

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::models::{Account, IndexerCursor, Transfer};

// =============================================================================
// Repository Traits
// =============================================================================

/// Repository for account data.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Bulk-fetch the accounts whose id is in `ids`.
    ///
    /// Ids with no stored account are simply absent from the result.
    async fn find_accounts(&self, ids: &[String]) -> StorageResult<Vec<Account>>;
}

/// Read side of the indexing position.
///
/// A store holds a single chain: the first committed batch binds it to
/// that chain's genesis hash.
#[async_trait]
pub trait CursorRepository: Send + Sync {
    /// Genesis hash of the chain the store is bound to, `None` while
    /// nothing has been committed.
    async fn bound_chain(&self) -> StorageResult<Option<String>>;

    /// Highest block committed for `chain_id`.
    async fn last_indexed_block(&self, chain_id: &str) -> StorageResult<Option<u64>>;
}

// =============================================================================
// Composite Repository
// =============================================================================

/// Everything one batch writes.
#[derive(Debug)]
pub struct BatchData<'a> {
    pub accounts: &'a [Arc<Account>],
    pub transfers: &'a [Transfer],
    pub cursor: &'a IndexerCursor,
}

/// Combined repository access for the indexer.
#[async_trait]
pub trait Repositories: Send + Sync {
    /// Access the account repository.
    fn accounts(&self) -> &dyn AccountRepository;

    /// Access the cursor repository.
    fn cursor(&self) -> &dyn CursorRepository;

    /// Persist a batch atomically.
    ///
    /// Order is fixed: accounts are upserted (idempotent), then transfers
    /// inserted (a transfer id that already exists is an error), then the
    /// cursor is updated. If any step fails nothing is kept.
    async fn persist_batch_atomic(&self, data: BatchData<'_>) -> StorageResult<()>;
}
