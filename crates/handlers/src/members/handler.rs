//! Handler for `Members.member_remark`.

use std::sync::Arc;

use tracing::{debug, warn};

use tally_core::error::DomainResult;
use tally_core::models::{TransferEvent, TransferKind};
use tally_core::ports::{AddressCodec, CallContext, CallHandler};
use tally_core::schema::Payload;
use tally_core::schema::members::{MEMBER_REMARK_CALL, MEMBER_REMARKED, MemberRemarked};

/// Extracts `kind = remark` records from paid member remarks.
pub struct RemarkPaymentHandler {
    codec: Arc<dyn AddressCodec>,
}

impl RemarkPaymentHandler {
    pub fn new(codec: Arc<dyn AddressCodec>) -> Self {
        Self { codec }
    }
}

impl CallHandler for RemarkPaymentHandler {
    fn name(&self) -> &'static str {
        "members"
    }

    fn call_names(&self) -> &'static [&'static str] {
        &[MEMBER_REMARK_CALL]
    }

    fn extract(&self, ctx: &CallContext<'_>) -> DomainResult<Option<TransferEvent>> {
        let Some(event) = ctx.find_event(MEMBER_REMARKED.name) else {
            warn!(block = ctx.block.number, call = %ctx.call.id, "No MemberRemarked event for member_remark");
            return Ok(None);
        };

        let (msg, payment) = match MEMBER_REMARKED.decode(&Payload::event(ctx.block, event))? {
            MemberRemarked::V2001 {
                msg,
                payment: Some(payment),
                ..
            } => (msg, payment),
            _ => {
                debug!(block = ctx.block.number, call = %ctx.call.id, "Remark without payment");
                return Ok(None);
            }
        };

        let Some(signer) = ctx.signer() else {
            warn!(block = ctx.block.number, call = %ctx.call.id, "Paid remark without signer, skipped");
            return Ok(None);
        };

        let mut record = ctx.transfer_event(
            TransferKind::Remark,
            self.codec.encode(&signer),
            self.codec.encode(&payment.recipient),
            payment.amount,
        )?;
        record.remark = Some(remark_text(&msg));
        Ok(Some(record))
    }
}

/// Remark bytes as storable text: invalid UTF-8 and NUL (rejected by
/// Postgres `TEXT`) both become U+FFFD.
fn remark_text(msg: &[u8]) -> String {
    String::from_utf8_lossy(msg).replace('\0', "\u{fffd}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use tally_core::models::AccountId;
    use tally_core::ports::{RawBlock, Ss58Codec};

    use crate::testing::*;

    fn handler() -> RemarkPaymentHandler {
        RemarkPaymentHandler::new(Arc::new(Ss58Codec::default()))
    }

    fn remark_block(spec_version: u32, signer: Option<AccountId>, args: serde_json::Value) -> RawBlock {
        block(
            10,
            spec_version,
            vec![extrinsic(1, signer, 1, vec![])],
            vec![call(1, MEMBER_REMARK_CALL, json!({}), vec![remarked_event(args)])],
        )
    }

    fn extract(block: &RawBlock) -> DomainResult<Option<TransferEvent>> {
        let ctx = CallContext {
            block,
            call: &block.calls[0],
            extrinsic: block.extrinsic(1),
            fee: 4,
        };
        handler().extract(&ctx)
    }

    // Test critique: remarque avec paiement (C, 500) signée par S
    #[test]
    fn test_paid_remark_record() {
        let signer = AccountId([5; 32]);
        let carol = AccountId([0xc; 32]);
        let msg = "Merci pour le café ☕";
        let bytes: Vec<u8> = msg.as_bytes().to_vec();
        let block = remark_block(2001, Some(signer), json!([42, bytes, [carol.to_hex(), "500"]]));

        let record = extract(&block).unwrap().unwrap();
        assert_eq!(record.kind, TransferKind::Remark);
        assert_eq!(record.from, address(&signer));
        assert_eq!(record.to, address(&carol));
        assert_eq!(record.amount, 500);
        assert_eq!(record.fee, Some(4));
        assert_eq!(record.remark.as_deref(), Some(msg));
    }

    #[test]
    fn test_oldest_layout_yields_nothing() {
        let block = remark_block(1000, Some(AccountId([5; 32])), json!([42, "0x6869"]));
        assert!(extract(&block).unwrap().is_none());
    }

    #[test]
    fn test_remark_without_payment_yields_nothing() {
        let block = remark_block(2001, Some(AccountId([5; 32])), json!([42, "0x6869", null]));
        assert!(extract(&block).unwrap().is_none());
    }

    #[test]
    fn test_missing_signer_is_skipped() {
        let carol = AccountId([0xc; 32]);
        let block = remark_block(2001, None, json!([42, "0x6869", [carol.to_hex(), 500]]));
        assert!(extract(&block).unwrap().is_none());
    }

    #[test]
    fn test_missing_event_is_skipped() {
        let mut block = remark_block(2001, Some(AccountId([5; 32])), json!([42, "0x6869", null]));
        block.calls[0].events = vec![event("System.ExtrinsicSuccess", json!({}))];
        assert!(extract(&block).unwrap().is_none());
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let carol = AccountId([0xc; 32]);
        let block = remark_block(
            2001,
            Some(AccountId([5; 32])),
            json!([42, "0x68ff69", [carol.to_hex(), "1"]]),
        );
        let record = extract(&block).unwrap().unwrap();
        assert_eq!(record.remark.as_deref(), Some("h\u{fffd}i"));
    }

    // Un octet NUL ferait échouer toute la transaction Postgres
    #[test]
    fn test_nul_byte_is_replaced() {
        let carol = AccountId([0xc; 32]);
        let block = remark_block(
            2001,
            Some(AccountId([5; 32])),
            json!([42, [104, 0, 105], [carol.to_hex(), "500"]]),
        );
        let record = extract(&block).unwrap().unwrap();
        let remark = record.remark.unwrap();
        assert!(!remark.contains('\0'));
        assert_eq!(remark, "h\u{fffd}i");
    }
}
