//! Port trait for the block ingestion source.
//!
//! The source delivers contiguous ranges of blocks as [`Batch`]es, each block
//! already split into calls, extrinsics and events. Implementations live in
//! the infrastructure layer (e.g., `tally-substrate`).

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::ChainResult;
use crate::models::{AccountId, BlockHash};

/// Raw block data from the chain before extraction.
#[derive(Debug, Clone)]
pub struct RawBlock {
    /// Block number (height).
    pub number: u64,
    /// Block hash.
    pub hash: [u8; 32],
    /// Block timestamp in milliseconds (from Timestamp pallet).
    pub timestamp: Option<u64>,
    /// Runtime spec version the block was produced with.
    pub spec_version: u32,
    /// Extrinsics in execution order.
    pub extrinsics: Vec<RawExtrinsic>,
    /// Calls in execution order.
    pub calls: Vec<RawCall>,
}

impl RawBlock {
    /// Look up an extrinsic by its index in the block.
    pub fn extrinsic(&self, index: u32) -> Option<&RawExtrinsic> {
        self.extrinsics.iter().find(|e| e.index == index)
    }
}

/// Raw extrinsic data.
#[derive(Debug, Clone)]
pub struct RawExtrinsic {
    /// Index in block.
    pub index: u32,
    /// Extrinsic hash.
    pub hash: [u8; 32],
    /// Signer (if signed).
    pub signer: Option<AccountId>,
    /// Number of calls dispatched by this extrinsic (0 if unknown).
    pub subcall_count: u32,
    /// Every event emitted by the extrinsic, sub-call events included.
    pub events: Vec<RawEvent>,
}

/// Raw call data.
#[derive(Debug, Clone)]
pub struct RawCall {
    /// Call id, unique within the chain.
    pub id: String,
    /// Qualified call name (e.g., "Balances.transfer_keep_alive").
    pub name: String,
    /// Owning extrinsic index.
    pub extrinsic_index: Option<u32>,
    /// Arguments as JSON.
    pub args: serde_json::Value,
    /// Events emitted within this call's scope.
    pub events: Vec<RawEvent>,
}

/// Raw event data.
#[derive(Debug, Clone)]
pub struct RawEvent {
    /// Index in block.
    pub index: u32,
    /// Qualified event name (e.g., "Balances.Transfer").
    pub name: String,
    /// Event data as JSON.
    pub args: serde_json::Value,
    /// Extrinsic index (if applicable).
    pub extrinsic_index: Option<u32>,
}

/// A contiguous range of blocks in ascending height order.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub blocks: Vec<RawBlock>,
}

impl Batch {
    /// Height range covered by this batch.
    pub fn range(&self) -> Option<(u64, u64)> {
        Some((self.blocks.first()?.number, self.blocks.last()?.number))
    }
}

/// Stream of block batches.
pub type BatchStream = Pin<Box<dyn Stream<Item = ChainResult<Batch>> + Send>>;

/// Port trait for blockchain data source.
#[async_trait]
pub trait BatchSource: Send + Sync {
    /// Get the genesis hash of the connected chain.
    async fn genesis_hash(&self) -> ChainResult<BlockHash>;

    /// Subscribe to batches of finalized blocks.
    ///
    /// With `from` set, the stream starts at that height and catches up to
    /// the finalized head before following it, so no height is skipped.
    /// Without it, the stream starts at the current finalized head.
    async fn subscribe_batches(&self, from: Option<u64>) -> ChainResult<BatchStream>;
}
