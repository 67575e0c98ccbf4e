//! Per-call fee attribution.
//!
//! The fee of an extrinsic is read from the first `Balances.Withdraw` event in
//! its full event list and split evenly across its sub-calls with floor
//! division. Extrinsics with several withdrawal legs are undercounted.

use tracing::warn;

use crate::error::{DomainError, DomainResult};
use crate::metrics::record_fee_event_missing;
use crate::ports::{RawBlock, RawCall, RawExtrinsic};
use crate::schema::Payload;
use crate::schema::balances::WITHDRAW;

/// Total fee withdrawn for an extrinsic.
///
/// Fails with [`DomainError::MissingExpectedEvent`] when the extrinsic has no
/// withdrawal event.
pub fn extrinsic_fee(block: &RawBlock, extrinsic: &RawExtrinsic) -> DomainResult<u128> {
    let event = extrinsic
        .events
        .iter()
        .find(|e| e.name == WITHDRAW.name)
        .ok_or_else(|| DomainError::MissingExpectedEvent {
            event: WITHDRAW.name,
            call: hex_hash(&extrinsic.hash),
        })?;

    Ok(WITHDRAW.decode(&Payload::event(block, event))?.amount)
}

/// Share of the extrinsic fee attributed to `call`.
///
/// A missing withdrawal event (or owning extrinsic) yields 0. A withdrawal
/// event the schema table rejects is fatal like any other payload.
pub fn attribute_fee(
    block: &RawBlock,
    call: &RawCall,
    extrinsic: Option<&RawExtrinsic>,
) -> DomainResult<u128> {
    let Some(extrinsic) = extrinsic else {
        warn!(block = block.number, call = %call.id, "No extrinsic for call, fee set to 0");
        record_fee_event_missing();
        return Ok(0);
    };

    let total = match extrinsic_fee(block, extrinsic) {
        Ok(total) => total,
        Err(e @ DomainError::MissingExpectedEvent { .. }) => {
            warn!(block = block.number, error = %e, "No withdraw event found for extrinsic");
            record_fee_event_missing();
            0
        }
        Err(e) => return Err(e),
    };

    Ok(total / u128::from(extrinsic.subcall_count.max(1)))
}

fn hex_hash(hash: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(hash))
}
