//! Core indexer service - orchestrates batch processing.
//!
//! The service consumes batches of finalized blocks from a [`BatchSource`],
//! extracts transfers, resolves their accounts and commits everything in one
//! atomic write per batch.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::error::{IndexerError, IndexerResult};
use crate::metrics::{ProcessingTimer, record_batch_indexed};
use crate::models::{BlockHash, IndexerCursor};
use crate::ports::{Batch, BatchData, BatchSource, HandlerRegistry, Repositories};
use crate::services::accounts::materialize_accounts;
use crate::services::extract::extract_transfer_events;

const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(500);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the indexer service.
#[derive(Debug, Clone, Default)]
pub struct IndexerConfig {
    /// Chain identifier (genesis hash hex).
    pub chain_id: String,
}

/// Outcome of one processed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Heights committed, `None` when every block was already indexed.
    pub range: Option<(u64, u64)>,
    pub blocks: usize,
    pub transfers: usize,
    pub accounts: usize,
    pub accounts_created: usize,
}

impl BatchSummary {
    /// Whether nothing was committed.
    pub fn is_skipped(&self) -> bool {
        self.blocks == 0
    }
}

// =============================================================================
// IndexerService
// =============================================================================

/// Main indexer service.
///
/// # Flow
///
/// 1. Subscribe to batches of finalized blocks
/// 2. Drop blocks already covered by the cursor
/// 3. Run the call handlers to extract transfers
/// 4. Materialize the accounts touched by the batch
/// 5. Persist accounts, transfers and cursor atomically
///
/// Any batch failure stops the service. Nothing of the failed batch is
/// written, so a restart re-delivers it from the cursor.
pub struct IndexerService<S: BatchSource, R: Repositories> {
    config: IndexerConfig,
    source: Arc<S>,
    repositories: Arc<R>,
    handlers: Arc<HandlerRegistry>,
}

impl<S: BatchSource, R: Repositories> IndexerService<S, R> {
    pub fn new(
        config: IndexerConfig,
        source: Arc<S>,
        repositories: Arc<R>,
        handlers: Arc<HandlerRegistry>,
    ) -> Self {
        Self {
            config,
            source,
            repositories,
            handlers,
        }
    }

    /// Start the indexer.
    ///
    /// Returns [`IndexerError::ShutdownRequested`] once `shutdown_rx` flips,
    /// or the first batch error.
    #[instrument(skip_all, fields(chain = %short(&self.config.chain_id)))]
    pub async fn run(
        &self,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> IndexerResult<()> {
        info!(
            calls = ?self.handlers.registered_calls(),
            "⛓️  Starting indexer"
        );

        self.verify_chain_id().await?;
        self.follow_batches(&mut shutdown_rx).await
    }

    /// Verify the connected chain matches any existing indexed data.
    async fn verify_chain_id(&self) -> IndexerResult<()> {
        let cursor = self.repositories.cursor();

        if let Some(bound) = cursor.bound_chain().await? {
            if bound != self.config.chain_id {
                error!(
                    connected = short(&self.config.chain_id),
                    expected = short(&bound),
                    "❌ Chain mismatch! Database contains data from a different chain"
                );
                error!(
                    "   Manual action required: either connect to the correct chain or clear the database"
                );

                return Err(IndexerError::ChainMismatch {
                    connected: self.config.chain_id.clone(),
                    expected: bound,
                });
            }
            let block = cursor.last_indexed_block(&bound).await?;
            debug!(?block, "Chain ID verified, resuming");
        }

        Ok(())
    }

    /// Consume batches, resubscribing with exponential backoff.
    #[instrument(skip_all)]
    async fn follow_batches(
        &self,
        shutdown_rx: &mut tokio::sync::watch::Receiver<bool>,
    ) -> IndexerResult<()> {
        let mut retry_delay = INITIAL_RETRY_DELAY;

        loop {
            if *shutdown_rx.borrow() {
                debug!("Shutdown requested");
                return Err(IndexerError::ShutdownRequested);
            }

            let from = self
                .repositories
                .cursor()
                .last_indexed_block(&self.config.chain_id)
                .await?
                .map(|n| n + 1);

            match self.source.subscribe_batches(from).await {
                Ok(mut stream) => {
                    debug!(?from, "📡 Subscription established");
                    retry_delay = INITIAL_RETRY_DELAY;

                    loop {
                        let next = tokio::select! {
                            next = stream.next() => next,
                            _ = shutdown_rx.changed() => {
                                debug!("Shutdown requested");
                                return Err(IndexerError::ShutdownRequested);
                            }
                        };

                        match next {
                            Some(Ok(batch)) => {
                                let range = batch.range();
                                match self.process_batch(batch).await {
                                    Ok(summary) if summary.is_skipped() => {
                                        trace!(?range, "Batch skipped (already indexed)");
                                    }
                                    Ok(summary) => {
                                        info!(
                                            range = ?summary.range,
                                            transfers = summary.transfers,
                                            accounts = summary.accounts_created,
                                            "⛓️  Batch indexed"
                                        );
                                    }
                                    Err(e) => {
                                        error!(?range, error = %e, "❌ Batch processing failed");
                                        return Err(e);
                                    }
                                }
                            }
                            Some(Err(e)) => {
                                warn!(error = ?e, "⚠️  Subscription error, reconnecting...");
                                break;
                            }
                            None => {
                                warn!("⚠️  Subscription ended, reconnecting...");
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        error = ?e,
                        retry_in_ms = retry_delay.as_millis(),
                        "⚠️  Failed to subscribe, retrying..."
                    );
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(retry_delay) => {
                    debug!(retry_delay_ms = retry_delay.as_millis(), "🔄 Reconnecting to chain...");
                    retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        return Err(IndexerError::ShutdownRequested);
                    }
                }
            }
        }
    }

    /// Process one batch end to end.
    ///
    /// Blocks at or below the stored cursor are dropped first. Extraction
    /// and account resolution happen entirely before the single write, so
    /// any error leaves the store untouched.
    #[instrument(skip_all, fields(range = ?batch.range()))]
    pub async fn process_batch(&self, batch: Batch) -> IndexerResult<BatchSummary> {
        let latest = self
            .repositories
            .cursor()
            .last_indexed_block(&self.config.chain_id)
            .await?;

        let mut blocks = batch.blocks;
        if let Some(latest) = latest {
            blocks.retain(|b| b.number > latest);
        }

        let Some(last) = blocks.last() else {
            return Ok(BatchSummary::default());
        };
        let first_number = blocks[0].number;
        if let Some(latest) = latest
            && first_number > latest + 1
        {
            warn!(
                block = first_number,
                latest,
                gap = first_number - latest - 1,
                "⚠️  Gap detected in block sequence"
            );
        }
        let new_cursor = IndexerCursor {
            chain_id: self.config.chain_id.clone(),
            last_indexed_block: last.number,
            last_indexed_hash: BlockHash(last.hash),
            updated_at: Utc::now(),
        };

        let _timer = ProcessingTimer::new();

        let events = extract_transfer_events(&blocks, &self.handlers)?;
        trace!(events = events.len(), "Transfers extracted");

        let arena = materialize_accounts(self.repositories.accounts(), &events).await?;
        let accounts = arena.accounts();
        let transfers = arena.build_transfers(events)?;

        self.repositories
            .persist_batch_atomic(BatchData {
                accounts: &accounts,
                transfers: &transfers,
                cursor: &new_cursor,
            })
            .await?;

        record_batch_indexed(blocks.len() as u64);

        Ok(BatchSummary {
            range: Some((first_number, new_cursor.last_indexed_block)),
            blocks: blocks.len(),
            transfers: transfers.len(),
            accounts: accounts.len(),
            accounts_created: arena.created(),
        })
    }
}

fn short(chain_id: &str) -> &str {
    &chain_id[..16.min(chain_id.len())]
}
