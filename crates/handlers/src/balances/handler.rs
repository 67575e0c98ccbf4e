//! Handler for direct balance transfer calls.

use std::sync::Arc;

use tracing::debug;

use tally_core::error::DomainResult;
use tally_core::models::{TransferEvent, TransferKind};
use tally_core::ports::{AddressCodec, CallContext, CallHandler};
use tally_core::schema::Payload;
use tally_core::schema::balances::{
    TRANSFER, TRANSFER_ALL_CALL, TRANSFER_CALL, TRANSFER_KEEP_ALIVE_CALL,
};

/// Extracts `kind = transfer` records from `Balances.transfer*` calls.
pub struct DirectTransferHandler {
    codec: Arc<dyn AddressCodec>,
}

impl DirectTransferHandler {
    pub fn new(codec: Arc<dyn AddressCodec>) -> Self {
        Self { codec }
    }
}

impl CallHandler for DirectTransferHandler {
    fn name(&self) -> &'static str {
        "balances"
    }

    fn call_names(&self) -> &'static [&'static str] {
        &[TRANSFER_CALL, TRANSFER_ALL_CALL, TRANSFER_KEEP_ALIVE_CALL]
    }

    fn extract(&self, ctx: &CallContext<'_>) -> DomainResult<Option<TransferEvent>> {
        let Some(event) = ctx.find_event(TRANSFER.name) else {
            debug!(block = ctx.block.number, call = %ctx.call.id, "No Transfer event in call");
            return Ok(None);
        };

        let transfer = TRANSFER.decode(&Payload::event(ctx.block, event))?;

        ctx.transfer_event(
            TransferKind::Transfer,
            self.codec.encode(&transfer.from),
            self.codec.encode(&transfer.to),
            transfer.amount,
        )
        .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use tally_core::error::DomainError;
    use tally_core::models::AccountId;
    use tally_core::ports::Ss58Codec;

    use crate::testing::*;

    fn handler() -> DirectTransferHandler {
        DirectTransferHandler::new(Arc::new(Ss58Codec::default()))
    }

    // Test critique: A→B 1000 avec un prélèvement de 30 sur un seul sous-appel
    #[test]
    fn test_direct_transfer_record() {
        let a = AccountId([0xa; 32]);
        let b = AccountId([0xb; 32]);
        let block = block(
            10,
            2001,
            vec![extrinsic(1, Some(a), 1, vec![withdraw_event(&a, 30)])],
            vec![call(1, TRANSFER_CALL, json!({}), vec![transfer_event(&a, &b, 1000)])],
        );
        let ctx = CallContext {
            block: &block,
            call: &block.calls[0],
            extrinsic: block.extrinsic(1),
            fee: 30,
        };

        let record = handler().extract(&ctx).unwrap().unwrap();
        assert_eq!(record.kind, TransferKind::Transfer);
        assert_eq!(record.from, address(&a));
        assert_eq!(record.to, address(&b));
        assert_eq!(record.amount, 1000);
        assert_eq!(record.fee, Some(30));
        assert_eq!(record.id, block.calls[0].id);
        assert_eq!(record.block_number, 10);
        assert_eq!(record.timestamp.timestamp_millis() as u64, TIMESTAMP_MS);
        assert_eq!(record.extrinsic_hash.map(|h| h.0), Some([1; 32]));
        assert_eq!(record.remark, None);
        assert_eq!(record.vesting_duration_blocks, None);
    }

    #[test]
    fn test_call_without_transfer_event_yields_nothing() {
        let block = block(
            10,
            2001,
            vec![],
            vec![call(1, TRANSFER_ALL_CALL, json!({}), vec![event("System.ExtrinsicSuccess", json!({}))])],
        );
        let ctx = CallContext { block: &block, call: &block.calls[0], extrinsic: None, fee: 0 };

        assert!(handler().extract(&ctx).unwrap().is_none());
    }

    #[test]
    fn test_pre_v1000_runtime_is_unsupported() {
        let a = AccountId([0xa; 32]);
        let block = block(
            10,
            999,
            vec![],
            vec![call(1, TRANSFER_CALL, json!({}), vec![transfer_event(&a, &a, 1)])],
        );
        let ctx = CallContext { block: &block, call: &block.calls[0], extrinsic: None, fee: 0 };

        let err = handler().extract(&ctx).unwrap_err();
        assert!(matches!(err, DomainError::UnsupportedSpecVersion { spec_version: 999, .. }));
    }

    // Test critique: un Transfer au layout inconnu interrompt le lot
    #[test]
    fn test_transfer_event_with_new_layout_aborts() {
        let a = AccountId([0xa; 32]);
        let b = AccountId([0xb; 32]);
        let mut args = transfer_event(&a, &b, 1000).args;
        args["memo"] = serde_json::Value::Null;
        let block = block(
            10,
            3000,
            vec![],
            vec![call(1, TRANSFER_CALL, json!({}), vec![event("Balances.Transfer", args)])],
        );
        let ctx = CallContext { block: &block, call: &block.calls[0], extrinsic: None, fee: 0 };

        let err = handler().extract(&ctx).unwrap_err();
        assert!(matches!(err, DomainError::LayoutMismatch { spec_version: 3000, .. }));
    }

    #[test]
    fn test_malformed_transfer_event_aborts() {
        let block = block(
            10,
            2001,
            vec![],
            vec![call(
                1,
                TRANSFER_CALL,
                json!({}),
                vec![event("Balances.Transfer", json!({"from": "0x00", "amount": 1}))],
            )],
        );
        let ctx = CallContext { block: &block, call: &block.calls[0], extrinsic: None, fee: 0 };

        let err = handler().extract(&ctx).unwrap_err();
        assert!(err.is_fatal());
    }
}
