//! Handler for `Vesting.vested_transfer`.

use std::sync::Arc;

use tracing::warn;

use tally_core::error::DomainResult;
use tally_core::models::{TransferEvent, TransferKind};
use tally_core::ports::{AddressCodec, CallContext, CallHandler};
use tally_core::schema::Payload;
use tally_core::schema::vesting::{VESTED_TRANSFER, VESTED_TRANSFER_CALL, VestingInfo};

/// Blocks from `height` until `schedule` is fully vested.
///
/// `locked / per_block` plus the wait until `starting_block`, saturating at
/// `u64::MAX`. `None` when `per_block` is zero.
pub fn vesting_duration(schedule: &VestingInfo, height: u64) -> Option<u64> {
    let release = schedule.locked.checked_div(schedule.per_block)?;
    let wait = schedule.starting_block.saturating_sub(height);
    Some(u64::try_from(release).unwrap_or(u64::MAX).saturating_add(wait))
}

/// Extracts `kind = vested` records from `Vesting.vested_transfer` calls.
pub struct VestedTransferHandler {
    codec: Arc<dyn AddressCodec>,
}

impl VestedTransferHandler {
    pub fn new(codec: Arc<dyn AddressCodec>) -> Self {
        Self { codec }
    }
}

impl CallHandler for VestedTransferHandler {
    fn name(&self) -> &'static str {
        "vesting"
    }

    fn call_names(&self) -> &'static [&'static str] {
        &[VESTED_TRANSFER_CALL]
    }

    fn extract(&self, ctx: &CallContext<'_>) -> DomainResult<Option<TransferEvent>> {
        let args = VESTED_TRANSFER.decode(&Payload::call(ctx.block, ctx.call))?;

        let Some(signer) = ctx.signer() else {
            warn!(block = ctx.block.number, call = %ctx.call.id, "Vested transfer without signer, skipped");
            return Ok(None);
        };

        let Some(duration) = vesting_duration(&args.schedule, ctx.block.number) else {
            warn!(block = ctx.block.number, call = %ctx.call.id, "Vesting schedule with zero per_block, skipped");
            return Ok(None);
        };

        let mut record = ctx.transfer_event(
            TransferKind::Vested,
            self.codec.encode(&signer),
            self.codec.encode(&args.target),
            args.schedule.locked,
        )?;
        record.vesting_duration_blocks = Some(duration);
        Ok(Some(record))
    }
}
