//! Block and call builders shared by the extractor tests.

use serde_json::json;

use tally_core::models::AccountId;
use tally_core::ports::{AddressCodec, RawBlock, RawCall, RawEvent, RawExtrinsic, Ss58Codec};

/// 2023-11-14T22:13:20Z
pub const TIMESTAMP_MS: u64 = 1_700_000_000_000;

pub fn address(account: &AccountId) -> String {
    Ss58Codec::default().encode(account)
}

pub fn event(name: &str, args: serde_json::Value) -> RawEvent {
    RawEvent {
        index: 0,
        name: name.into(),
        args,
        extrinsic_index: None,
    }
}

pub fn transfer_event(from: &AccountId, to: &AccountId, amount: u128) -> RawEvent {
    event(
        "Balances.Transfer",
        json!({"from": from.to_hex(), "to": to.to_hex(), "amount": amount.to_string()}),
    )
}

pub fn withdraw_event(who: &AccountId, amount: u128) -> RawEvent {
    event(
        "Balances.Withdraw",
        json!({"who": who.to_hex(), "amount": amount.to_string()}),
    )
}

pub fn remarked_event(args: serde_json::Value) -> RawEvent {
    event("Members.MemberRemarked", args)
}

pub fn extrinsic(
    index: u32,
    signer: Option<AccountId>,
    subcall_count: u32,
    events: Vec<RawEvent>,
) -> RawExtrinsic {
    RawExtrinsic {
        index,
        hash: [index as u8; 32],
        signer,
        subcall_count,
        events,
    }
}

/// Call owned by the extrinsic with the same index.
pub fn call(index: u32, name: &str, args: serde_json::Value, events: Vec<RawEvent>) -> RawCall {
    RawCall {
        id: format!("0000000010-{:06}-abcde", index),
        name: name.into(),
        extrinsic_index: Some(index),
        args,
        events,
    }
}

pub fn block(
    number: u64,
    spec_version: u32,
    extrinsics: Vec<RawExtrinsic>,
    calls: Vec<RawCall>,
) -> RawBlock {
    RawBlock {
        number,
        hash: [0xbb; 32],
        timestamp: Some(TIMESTAMP_MS),
        spec_version,
        extrinsics,
        calls,
    }
}
