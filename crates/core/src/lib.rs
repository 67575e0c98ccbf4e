//! Core domain layer for the Tally transfer indexer.
//!
//! This crate contains the domain models, port traits (interfaces), the
//! versioned schema decoders and the services that turn blocks into
//! accounts and transfers. It follows hexagonal architecture principles -
//! this is the innermost layer with no dependencies on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       tally (binary)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  tally-handlers   │  tally-storage     │  tally-substrate   │
//! │  (extractors)     │  (PostgreSQL)      │  (RPC)             │
//! ├───────────────────┴────────────────────┴────────────────────┤
//! │                     tally-core  ← YOU ARE HERE              │
//! │          (models, ports, schema, services)                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Domain models (TransferEvent, Account, Transfer, cursor)
//! - [`ports`] - Interface traits for adapters to implement
//! - [`schema`] - Append-only versioned decoders for call/event payloads
//! - [`services`] - Classifier, fee attribution, account arena, IndexerService
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Batch lifecycle
//!
//! 1. Receive a batch of finalized blocks from a [`ports::BatchSource`]
//! 2. Drop failed and event-less calls, attribute fees to the rest
//! 3. Run the matching [`ports::CallHandler`] on each call
//! 4. Resolve every address to one shared account per batch
//! 5. Persist accounts, transfers and cursor atomically

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod schema;
pub mod services;
