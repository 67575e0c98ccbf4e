//! Vested transfers.
//!
//! `Vesting.vested_transfer` locks `locked` on the target account and
//! releases it at `per_block` from `starting_block`. The record carries the
//! full locked amount and how many blocks after inclusion the schedule is
//! fully vested.

mod handler;

pub use handler::{VestedTransferHandler, vesting_duration};
