//! Substrate RPC client producing block batches with dynamic metadata decoding.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use async_trait::async_trait;
use blake2::Blake2b;
use blake2::digest::Digest;
use blake2::digest::consts::U32;
use futures::{StreamExt, future, stream};
use subxt::backend::legacy::{LegacyBackend, LegacyRpcMethods};
use subxt::backend::rpc::RpcClient;
use subxt::blocks::{Block, Extrinsics};
use subxt::events::{Events, Phase};
use subxt::{OnlineClient, PolkadotConfig};
use tracing::{debug, info, instrument, trace, warn};

use tally_core::error::{ChainError, ChainResult};
use tally_core::metrics::record_decode_error;
use tally_core::models::BlockHash;
use tally_core::ports::{Batch, BatchSource, BatchStream, RawBlock, RawCall, RawEvent, RawExtrinsic};

use crate::dispatch::CallTree;
use crate::decode::{
    composite_to_json, parse_timestamp_from_debug, signer_from_address, try_decode_compact_u64,
};
use crate::rate_limit::RateLimiter;

type Blake2b256 = Blake2b<U32>;

pub type SubstrateBlock = Block<PolkadotConfig, OnlineClient<PolkadotConfig>>;
type SubstrateExtrinsics = Extrinsics<PolkadotConfig, OnlineClient<PolkadotConfig>>;

/// Configuration for the Substrate client.
#[derive(Debug, Clone)]
pub struct SubstrateClientConfig {
    /// WebSocket URL (e.g., "ws://localhost:9944").
    pub ws_url: String,
    /// Maximum block fetches per second, 0 for unlimited.
    pub rate_limit: u32,
    /// Maximum number of blocks grouped into one batch.
    pub max_batch_blocks: usize,
}

impl Default for SubstrateClientConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://127.0.0.1:9944".to_string(),
            rate_limit: 0,
            max_batch_blocks: 50,
        }
    }
}

/// Substrate client adapter implementing the BatchSource port.
pub struct SubstrateClient {
    client: OnlineClient<PolkadotConfig>,
    rpc: LegacyRpcMethods<PolkadotConfig>,
    limiter: Arc<RateLimiter>,
    max_batch_blocks: usize,
}

impl SubstrateClient {
    /// Connect to a Substrate node.
    #[instrument(skip_all, fields(url = %config.ws_url))]
    pub async fn connect(config: SubstrateClientConfig) -> ChainResult<Self> {
        debug!("Connecting to node");

        let rpc_client = RpcClient::from_url(&config.ws_url)
            .await
            .map_err(|e| ChainError::ConnectionFailed(e.to_string()))?;
        // Catching up from the cursor reads arbitrary historical blocks,
        // which the chainHead backend can only serve while they are pinned.
        let backend = LegacyBackend::<PolkadotConfig>::builder().build(rpc_client.clone());
        let client = OnlineClient::<PolkadotConfig>::from_backend(Arc::new(backend))
            .await
            .map_err(|e| ChainError::ConnectionFailed(e.to_string()))?;

        debug!(
            rate_limit = config.rate_limit,
            max_batch_blocks = config.max_batch_blocks,
            "Connected successfully"
        );

        Ok(Self {
            client,
            rpc: LegacyRpcMethods::new(rpc_client),
            limiter: Arc::new(RateLimiter::per_second(config.rate_limit)),
            max_batch_blocks: config.max_batch_blocks.max(1),
        })
    }
}

#[async_trait]
impl BatchSource for SubstrateClient {
    async fn genesis_hash(&self) -> ChainResult<BlockHash> {
        let hash = self.client.genesis_hash();
        Ok(BlockHash(hash.0))
    }

    async fn subscribe_batches(&self, from: Option<u64>) -> ChainResult<BatchStream> {
        let subscription = self
            .client
            .blocks()
            .subscribe_finalized()
            .await
            .map_err(|e| ChainError::SubscriptionError(e.to_string()))?;

        // Every finalized head extends the range of heights still to fetch,
        // starting at `from` on the first notification.
        let heights = subscription
            .scan(from, |next, result| {
                let range = result
                    .map(|head| catch_up_range(next, head.number() as u64))
                    .map_err(|e| ChainError::SubscriptionError(e.to_string()));
                future::ready(Some(range))
            })
            .flat_map(|range| match range {
                Ok(range) => stream::iter(range.map(Ok::<u64, ChainError>)).left_stream(),
                Err(e) => stream::once(future::ready(Err(e))).right_stream(),
            });

        let client = self.client.clone();
        let rpc = self.rpc.clone();
        let limiter = self.limiter.clone();

        let blocks = heights.then(move |height| {
            let client = client.clone();
            let rpc = rpc.clone();
            let limiter = limiter.clone();
            async move {
                let height = height?;
                limiter.acquire().await;
                let block = block_at(&client, &rpc, height).await?;
                fetch_block(&rpc, &block).await
            }
        });

        // Consecutive blocks already available are grouped together
        let batches = blocks.ready_chunks(self.max_batch_blocks).map(|chunk| {
            chunk
                .into_iter()
                .collect::<ChainResult<Vec<_>>>()
                .map(|blocks| Batch { blocks })
        });

        Ok(Box::pin(batches))
    }
}

/// Heights to fetch once the finalized head reaches `head`.
///
/// `next` is the first height not fetched yet; `None` means start at the
/// head itself.
fn catch_up_range(next: &mut Option<u64>, head: u64) -> RangeInclusive<u64> {
    let start = next.unwrap_or(head);
    if head > start {
        info!(from = start, to = head, behind = head - start, "⏪ Catching up to finalized head");
    }
    *next = Some(start.max(head + 1));
    start..=head
}

/// Resolve a height to its canonical block.
async fn block_at(
    client: &OnlineClient<PolkadotConfig>,
    rpc: &LegacyRpcMethods<PolkadotConfig>,
    height: u64,
) -> ChainResult<SubstrateBlock> {
    let hash = rpc
        .chain_get_block_hash(Some(height.into()))
        .await
        .map_err(|e| ChainError::RpcError(e.to_string()))?
        .ok_or_else(|| ChainError::BlockFetchError {
            hash: format!("#{}", height),
            message: "no block at this height".into(),
        })?;

    client
        .blocks()
        .at(hash)
        .await
        .map_err(|e| ChainError::BlockFetchError {
            hash: format!("{:?}", hash),
            message: e.to_string(),
        })
}

// =============================================================================
// Block decoding helpers
// =============================================================================

/// Fetch and decode everything the extractors need from one block.
#[instrument(skip_all, fields(block = block.number()))]
async fn fetch_block(
    rpc: &LegacyRpcMethods<PolkadotConfig>,
    block: &SubstrateBlock,
) -> ChainResult<RawBlock> {
    let number = block.number() as u64;
    let hash: [u8; 32] = block.hash().into();
    let fetch_error = |message: String| ChainError::BlockFetchError {
        hash: format!("0x{}", hex::encode(hash)),
        message,
    };

    let spec_version = rpc
        .state_get_runtime_version(Some(block.hash()))
        .await
        .map_err(|e| fetch_error(e.to_string()))?
        .spec_version;

    let extrinsics = block
        .extrinsics()
        .await
        .map_err(|e| fetch_error(e.to_string()))?;
    let events = block
        .events()
        .await
        .map_err(|e| fetch_error(e.to_string()))?;

    let timestamp = get_block_timestamp(number, &extrinsics);
    let mut events_by_extrinsic = decode_events(&events);

    let mut raw_extrinsics = Vec::new();
    let mut calls = Vec::new();

    for (index, ext) in extrinsics.iter().enumerate() {
        let index = index as u32;
        let ext_hash: [u8; 32] = Blake2b256::digest(ext.bytes()).into();
        let ext_events = events_by_extrinsic.remove(&index).unwrap_or_default();

        let signer = ext.address_bytes().and_then(|bytes| {
            let signer = signer_from_address(bytes);
            if signer.is_none() {
                trace!(index, len = bytes.len(), "Unsupported signer address");
            }
            signer
        });

        let mut subcall_count = 0;
        match (ext.pallet_name(), ext.variant_name()) {
            (Ok(pallet), Ok(call)) => {
                let args = ext
                    .field_values()
                    .map(|composite| composite_to_json(&composite))
                    .unwrap_or_else(|e| {
                        trace!(index, error = ?e, "Failed to decode call args");
                        record_decode_error("extrinsic", pallet);
                        serde_json::Value::Null
                    });

                let dispatched = CallTree::parse(format!("{}.{}", pallet, call), args)
                    .dispatch(&ext_events);
                subcall_count = dispatched.len() as u32;

                for (sub, call) in dispatched.into_iter().enumerate() {
                    calls.push(RawCall {
                        id: call_id(number, index, sub as u32, &hash),
                        name: call.name,
                        extrinsic_index: Some(index),
                        args: call.args,
                        events: call.events,
                    });
                }
            }
            _ => {
                trace!(index, "Failed to decode call name");
                record_decode_error("extrinsic", "unknown");
            }
        }

        raw_extrinsics.push(RawExtrinsic {
            index,
            hash: ext_hash,
            signer,
            subcall_count,
            events: ext_events,
        });
    }

    Ok(RawBlock {
        number,
        hash,
        timestamp,
        spec_version,
        extrinsics: raw_extrinsics,
        calls,
    })
}

/// Call id: zero-padded height, extrinsic index and position among the
/// calls the extrinsic dispatched, then a block hash prefix.
fn call_id(number: u64, index: u32, sub: u32, block_hash: &[u8; 32]) -> String {
    let hash = hex::encode(block_hash);
    format!("{:010}-{:06}-{:03}-{}", number, index, sub, &hash[..5])
}

/// Decode events and group them by the extrinsic that emitted them.
///
/// Events outside an extrinsic (initialization, finalization) are dropped.
fn decode_events(events: &Events<PolkadotConfig>) -> BTreeMap<u32, Vec<RawEvent>> {
    let mut grouped: BTreeMap<u32, Vec<RawEvent>> = BTreeMap::new();

    for (index, event) in events.iter().enumerate() {
        match event {
            Ok(ev) => {
                let Phase::ApplyExtrinsic(extrinsic_index) = ev.phase() else {
                    continue;
                };

                let args = ev
                    .field_values()
                    .map(|composite| composite_to_json(&composite))
                    .unwrap_or(serde_json::Value::Null);

                grouped.entry(extrinsic_index).or_default().push(RawEvent {
                    index: index as u32,
                    name: format!("{}.{}", ev.pallet_name(), ev.variant_name()),
                    args,
                    extrinsic_index: Some(extrinsic_index),
                });
            }
            Err(e) => {
                trace!(index, error = ?e, "Failed to decode event");
                record_decode_error("event", "unknown");
            }
        }
    }

    grouped
}

/// Get timestamp from Timestamp.set inherent.
fn get_block_timestamp(number: u64, extrinsics: &SubstrateExtrinsics) -> Option<u64> {
    for ext in extrinsics.iter() {
        let (Ok(pallet), Ok(call)) = (ext.pallet_name(), ext.variant_name()) else {
            continue;
        };

        if pallet == "Timestamp" && call == "set" {
            if let Ok(values) = ext.field_values() {
                let value_str = format!("{:?}", values);
                if let Some(ts) = parse_timestamp_from_debug(&value_str) {
                    return Some(ts);
                }

                warn!(
                    block = number,
                    "Could not parse timestamp from Timestamp.set: {:?}", values
                );
            }

            let bytes = ext.bytes();
            if bytes.len() >= 5
                && let Some(ts) = try_decode_compact_u64(&bytes[2..])
            {
                return Some(ts);
            }
        }
    }

    None
}
