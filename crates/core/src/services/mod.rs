//! Core business logic services.

pub mod accounts;
pub mod classifier;
pub mod extract;
pub mod fees;
pub mod indexer;

pub use accounts::{AccountArena, materialize_accounts};
pub use classifier::{Exclusion, eligible_calls, exclusion};
pub use extract::extract_transfer_events;
pub use fees::{attribute_fee, extrinsic_fee};
pub use indexer::{BatchSummary, IndexerConfig, IndexerService};
