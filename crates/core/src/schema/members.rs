//! Members pallet payloads.

use crate::error::DomainResult;
use crate::models::AccountId;

use super::fields::{element, expect_tuple, parse_account, parse_amount, parse_bytes, parse_u64};
use super::{SchemaVersion, VersionedSchema, since_v2001, v1000_until_v2001};

/// `Members.member_remark` call.
pub const MEMBER_REMARK_CALL: &str = "Members.member_remark";

/// Payment attached to a member remark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemarkPayment {
    pub recipient: AccountId,
    pub amount: u128,
}

/// `Members.MemberRemarked` event, one variant per runtime layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberRemarked {
    /// `(member_id, msg)`, no payment support.
    V1000 { member_id: u64, msg: Vec<u8> },
    /// `(member_id, msg, Option<(recipient, amount)>)`.
    V2001 {
        member_id: u64,
        msg: Vec<u8>,
        payment: Option<RemarkPayment>,
    },
}

/// `Members.MemberRemarked` event.
pub static MEMBER_REMARKED: VersionedSchema<MemberRemarked> = VersionedSchema {
    name: "Members.MemberRemarked",
    versions: &[
        SchemaVersion {
            label: "v1000",
            is: v1000_until_v2001,
            decode: decode_member_remarked_v1000,
        },
        SchemaVersion {
            label: "v2001",
            is: since_v2001,
            decode: decode_member_remarked_v2001,
        },
    ],
};

fn decode_member_remarked_v1000(args: &serde_json::Value) -> DomainResult<MemberRemarked> {
    let items = expect_tuple(args, 2)?;
    Ok(MemberRemarked::V1000 {
        member_id: element(items, 0, parse_u64)?,
        msg: element(items, 1, parse_bytes)?,
    })
}

fn decode_member_remarked_v2001(args: &serde_json::Value) -> DomainResult<MemberRemarked> {
    let items = expect_tuple(args, 3)?;
    let payment = match &items[2] {
        serde_json::Value::Null => None,
        value => {
            let pair = expect_tuple(value, 2)?;
            Some(RemarkPayment {
                recipient: element(pair, 0, parse_account)?,
                amount: element(pair, 1, parse_amount)?,
            })
        }
    };
    Ok(MemberRemarked::V2001 {
        member_id: element(items, 0, parse_u64)?,
        msg: element(items, 1, parse_bytes)?,
        payment,
    })
}
