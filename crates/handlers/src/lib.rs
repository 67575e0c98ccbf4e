//! Transfer extractors for the Tally indexer.
//!
//! Each extractor implements [`CallHandler`] for one family of calls and
//! turns an eligible call into at most one
//! [`TransferEvent`](tally_core::models::TransferEvent):
//!
//! - [`DirectTransferHandler`] - `Balances.transfer`, `transfer_all`,
//!   `transfer_keep_alive`
//! - [`RemarkPaymentHandler`] - `Members.member_remark` carrying a payment
//! - [`VestedTransferHandler`] - `Vesting.vested_transfer`
//!
//! Raw account ids always go through the injected [`AddressCodec`].
//!
//! # Usage
//!
//! ```ignore
//! use tally_core::ports::Ss58Codec;
//!
//! let handlers = tally_handlers::transfer_handlers(Arc::new(Ss58Codec::default()));
//! ```

pub mod balances;
pub mod members;
pub mod vesting;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use tally_core::ports::{AddressCodec, CallHandler, HandlerRegistry};

pub use balances::DirectTransferHandler;
pub use members::RemarkPaymentHandler;
pub use vesting::VestedTransferHandler;

/// All extractors, each normalizing addresses with `codec`.
pub fn all_handlers(codec: Arc<dyn AddressCodec>) -> Vec<Arc<dyn CallHandler>> {
    vec![
        Arc::new(DirectTransferHandler::new(codec.clone())),
        Arc::new(RemarkPaymentHandler::new(codec.clone())),
        Arc::new(VestedTransferHandler::new(codec)),
    ]
}

/// Registry with every extractor registered.
pub fn transfer_handlers(codec: Arc<dyn AddressCodec>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    for handler in all_handlers(codec) {
        registry.register(handler);
    }
    registry
}
