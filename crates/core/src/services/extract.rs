//! Turns the blocks of a batch into transfer records.

use tracing::{debug, trace, warn};

use crate::error::DomainResult;
use crate::metrics::{record_decode_error, record_transfer_extracted};
use crate::models::TransferEvent;
use crate::ports::{CallContext, HandlerRegistry, RawBlock};
use crate::services::classifier::eligible_calls;
use crate::services::fees::attribute_fee;

/// Run every eligible call of `blocks` through its handler.
///
/// Blocks are expected in ascending height order; records come out in block
/// then call execution order. Fatal errors (unsupported runtime version,
/// block without timestamp) abort the whole extraction. Any other handler
/// error is logged and only drops the offending call.
pub fn extract_transfer_events(
    blocks: &[RawBlock],
    handlers: &HandlerRegistry,
) -> DomainResult<Vec<TransferEvent>> {
    let mut events = Vec::new();

    for block in blocks {
        trace!(block = block.number, calls = block.calls.len(), "Extracting block");

        for (call, handler) in eligible_calls(block, handlers) {
            let extrinsic = call.extrinsic_index.and_then(|idx| block.extrinsic(idx));
            let ctx = CallContext {
                block,
                call,
                extrinsic,
                fee: attribute_fee(block, call, extrinsic)?,
            };

            match handler.extract(&ctx) {
                Ok(Some(event)) => {
                    record_transfer_extracted(event.kind.as_str());
                    events.push(event);
                }
                Ok(None) => {
                    debug!(block = block.number, call = %call.id, handler = handler.name(), "No transfer in call");
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(
                        block = block.number,
                        call = %call.id,
                        name = %call.name,
                        error = %e,
                        "⚠️  Call skipped"
                    );
                    let pallet = call.name.split('.').next().unwrap_or_default();
                    record_decode_error("call", pallet);
                }
            }
        }
    }

    Ok(events)
}
