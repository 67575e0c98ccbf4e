//! Balances pallet payloads.

use crate::error::DomainResult;
use crate::models::AccountId;

use super::fields::{expect_struct, parse_account, parse_amount, required};
use super::{SchemaVersion, VersionedSchema, since_v1000};

/// `Balances.transfer` call.
pub const TRANSFER_CALL: &str = "Balances.transfer";
/// `Balances.transfer_all` call.
pub const TRANSFER_ALL_CALL: &str = "Balances.transfer_all";
/// `Balances.transfer_keep_alive` call.
pub const TRANSFER_KEEP_ALIVE_CALL: &str = "Balances.transfer_keep_alive";

/// Arguments of a `Balances.Transfer` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferArgs {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: u128,
}

/// Arguments of a `Balances.Withdraw` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawArgs {
    pub who: AccountId,
    pub amount: u128,
}

/// `Balances.Transfer` event.
pub static TRANSFER: VersionedSchema<TransferArgs> = VersionedSchema {
    name: "Balances.Transfer",
    versions: &[SchemaVersion {
        label: "v1000",
        is: since_v1000,
        decode: decode_transfer_v1000,
    }],
};

/// `Balances.Withdraw` event, the source of extrinsic fees.
pub static WITHDRAW: VersionedSchema<WithdrawArgs> = VersionedSchema {
    name: "Balances.Withdraw",
    versions: &[SchemaVersion {
        label: "v1000",
        is: since_v1000,
        decode: decode_withdraw_v1000,
    }],
};

fn decode_transfer_v1000(args: &serde_json::Value) -> DomainResult<TransferArgs> {
    expect_struct(args, &[&["from"], &["to"], &["amount"]])?;
    Ok(TransferArgs {
        from: required(args, &["from"], parse_account)?,
        to: required(args, &["to"], parse_account)?,
        amount: required(args, &["amount"], parse_amount)?,
    })
}

fn decode_withdraw_v1000(args: &serde_json::Value) -> DomainResult<WithdrawArgs> {
    expect_struct(args, &[&["who"], &["amount"]])?;
    Ok(WithdrawArgs {
        who: required(args, &["who"], parse_account)?,
        amount: required(args, &["amount"], parse_amount)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;
    use crate::schema::Payload;
    use serde_json::json;

    fn hex32(byte: u8) -> String {
        format!("0x{}", hex::encode([byte; 32]))
    }

    #[test]
    fn test_decode_transfer_v1000() {
        let args = json!({"from": hex32(1), "to": hex32(2), "amount": "1000"});
        let payload = Payload { spec_version: 2001, args: &args };
        let decoded = TRANSFER.decode(&payload).unwrap();
        assert_eq!(
            decoded,
            TransferArgs {
                from: AccountId([1; 32]),
                to: AccountId([2; 32]),
                amount: 1000,
            }
        );
    }

    // Un runtime plus récent qui ajoute un champ ne doit pas passer inaperçu
    #[test]
    fn test_transfer_with_extra_field_aborts() {
        let args = json!({"from": hex32(1), "to": hex32(2), "amount": "1000", "memo": null});
        let payload = Payload { spec_version: 3000, args: &args };
        let err = TRANSFER.decode(&payload).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, DomainError::LayoutMismatch { spec_version: 3000, .. }));
    }

    #[test]
    fn test_transfer_rejects_foreign_layout() {
        let args = json!({"from": hex32(1), "to": hex32(2), "value": "1000"});
        let payload = Payload { spec_version: 1000, args: &args };
        assert!(TRANSFER.decode(&payload).unwrap_err().is_fatal());
    }

    #[test]
    fn test_withdraw_before_first_runtime_is_unsupported() {
        let args = json!({"who": hex32(1), "amount": 30});
        let payload = Payload { spec_version: 9, args: &args };
        assert!(WITHDRAW.decode(&payload).unwrap_err().is_fatal());
    }
}
