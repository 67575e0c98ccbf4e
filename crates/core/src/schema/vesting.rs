//! Vesting pallet payloads.

use crate::error::{DomainError, DomainResult};
use crate::models::AccountId;

use super::fields::{expect_struct, named, parse_account, parse_amount, parse_u64, required};
use super::{SchemaVersion, VersionedSchema, since_v1000};

/// `Vesting.vested_transfer` call.
pub const VESTED_TRANSFER_CALL: &str = "Vesting.vested_transfer";

/// A vesting schedule: `locked` released at `per_block` from `starting_block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VestingInfo {
    pub locked: u128,
    pub per_block: u128,
    pub starting_block: u64,
}

/// Arguments of a `Vesting.vested_transfer` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VestedTransferArgs {
    pub target: AccountId,
    pub schedule: VestingInfo,
}

/// `Vesting.vested_transfer` call.
pub static VESTED_TRANSFER: VersionedSchema<VestedTransferArgs> = VersionedSchema {
    name: VESTED_TRANSFER_CALL,
    versions: &[SchemaVersion {
        label: "v1000",
        is: since_v1000,
        decode: decode_vested_transfer_v1000,
    }],
};

fn decode_vested_transfer_v1000(args: &serde_json::Value) -> DomainResult<VestedTransferArgs> {
    expect_struct(args, &[&["target"], &["schedule"]])?;
    let schedule = named(args, &["schedule"])
        .ok_or_else(|| DomainError::DecodingError("missing field 'schedule'".into()))?;
    expect_struct(
        schedule,
        &[&["locked"], &["perBlock", "per_block"], &["startingBlock", "starting_block"]],
    )?;

    Ok(VestedTransferArgs {
        target: required(args, &["target"], parse_account)?,
        schedule: VestingInfo {
            locked: required(schedule, &["locked"], parse_amount)?,
            per_block: required(schedule, &["perBlock", "per_block"], parse_amount)?,
            starting_block: required(schedule, &["startingBlock", "starting_block"], parse_u64)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Payload;
    use serde_json::json;

    #[test]
    fn test_decode_snake_and_camel_case_schedule() {
        let target = format!("0x{}", hex::encode([9u8; 32]));
        let expected = VestedTransferArgs {
            target: AccountId([9; 32]),
            schedule: VestingInfo { locked: 1200, per_block: 100, starting_block: 50 },
        };

        let args = json!({
            "target": {"Id": target},
            "schedule": {"locked": "1200", "per_block": "100", "starting_block": 50}
        });
        let payload = Payload { spec_version: 1000, args: &args };
        assert_eq!(VESTED_TRANSFER.decode(&payload).unwrap(), expected);

        let args = json!({
            "target": target,
            "schedule": {"locked": 1200, "perBlock": 100, "startingBlock": "50"}
        });
        let payload = Payload { spec_version: 2001, args: &args };
        assert_eq!(VESTED_TRANSFER.decode(&payload).unwrap(), expected);
    }

    #[test]
    fn test_schedule_missing_field_fails() {
        let target = format!("0x{}", hex::encode([9u8; 32]));
        let args = json!({"target": target, "schedule": {"locked": 1200, "per_block": 100}});
        let payload = Payload { spec_version: 1000, args: &args };
        assert!(VESTED_TRANSFER.decode(&payload).is_err());
    }
}
