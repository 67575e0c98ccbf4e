//! Direct balance transfers.
//!
//! # Handled Calls
//!
//! - `Balances.transfer`
//! - `Balances.transfer_all`
//! - `Balances.transfer_keep_alive`
//!
//! The transfer itself is read from the `Balances.Transfer` event the call
//! emitted, not from the call arguments, so `transfer_all` gets its real
//! amount.

mod handler;

pub use handler::DirectTransferHandler;
