//! Substrate RPC adapter for the Tally indexer.
//!
//! This crate implements the [`BatchSource`] port from `tally-core`,
//! providing connectivity to Substrate-based blockchains via WebSocket RPC.
//!
//! # Features
//!
//! - Finalized block subscription grouped into batches, resuming from a
//!   given height and filling any gap by fetching blocks by number
//! - `Utility.batch*` and `Proxy.proxy` expanded into the calls they dispatch
//! - Dynamic metadata decoding using subxt
//! - SCALE to JSON conversion for events and call arguments
//! - Runtime spec version per block, for versioned payload decoding
//! - Compact timestamp extraction from `Timestamp.set` inherent
//! - Optional rate limit on block fetches
//!
//! # Usage
//!
//! ```ignore
//! use tally_substrate::{SubstrateClient, SubstrateClientConfig};
//!
//! let config = SubstrateClientConfig {
//!     ws_url: "ws://localhost:9944".to_string(),
//!     ..Default::default()
//! };
//!
//! let client = SubstrateClient::connect(config).await?;
//! let mut stream = client.subscribe_batches(Some(cursor + 1)).await?;
//!
//! while let Some(batch) = stream.next().await {
//!     // Process batch...
//! }
//! ```
//!
//! Catching up from an old height needs a node that keeps historical state
//! (archive mode).
//!
//! A plain extrinsic maps to a single call whose events are the extrinsic's
//! events. A wrapper extrinsic maps to one call per dispatched leaf, each
//! scoped to its own events, and its sub-call count is the number of leaves.
//!
//! [`BatchSource`]: tally_core::ports::BatchSource

mod client;
mod decode;
mod dispatch;
mod rate_limit;

pub use client::{SubstrateClient, SubstrateClientConfig};
pub use rate_limit::RateLimiter;
