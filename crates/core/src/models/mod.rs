//! Domain models for extracted transfer activity.
//!
//! These models are storage-agnostic. [`TransferEvent`] is the intermediate
//! record produced by the extractors; [`Account`] and [`Transfer`] are what
//! gets persisted.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// 32-byte Hash Types
// =============================================================================

/// Macro to generate 32-byte hash newtypes with common functionality.
///
/// Generates:
/// - `from_hex()` - Parse from hex string (with or without 0x prefix)
/// - `to_hex()` - Convert to 0x-prefixed hex string
/// - `Display` trait implementation
/// - `From<[u8; 32]>` implementation
macro_rules! hash32_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// Parse from hex string (with or without 0x prefix).
            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let s = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(s)?;
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| hex::FromHexError::InvalidStringLength)?;
                Ok(Self(arr))
            }

            /// Convert to 0x-prefixed hex string.
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }

            /// Get the inner bytes.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

hash32_newtype!(
    /// 32-byte block or extrinsic hash (Blake2-256).
    BlockHash
);

hash32_newtype!(
    /// 32-byte raw account identifier, before address encoding.
    AccountId
);

// =============================================================================
// Transfers
// =============================================================================

/// Which extraction policy produced a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    /// `Balances.transfer*` calls.
    Transfer,
    /// `Members.member_remark` carrying a payment.
    Remark,
    /// `Vesting.vested_transfer` calls.
    Vested,
}

impl TransferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Remark => "remark",
            Self::Vested => "vested",
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized transfer extracted from a single call.
///
/// Lives only for the duration of a batch. Endpoints are encoded addresses,
/// not yet resolved to [`Account`] entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    /// Originating call id, unique within the chain.
    pub id: String,
    pub block_number: u64,
    pub block_hash: BlockHash,
    pub timestamp: DateTime<Utc>,
    /// Hash of the owning extrinsic (if any).
    pub extrinsic_hash: Option<BlockHash>,
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Amount transferred (in smallest unit).
    pub amount: u128,
    /// Approximate share of the extrinsic fee.
    pub fee: Option<u128>,
    pub kind: TransferKind,
    /// Remark text (remark transfers only).
    pub remark: Option<String>,
    /// Blocks until the schedule is fully vested (vested transfers only).
    pub vesting_duration_blocks: Option<u64>,
}

// =============================================================================
// Persisted entities
// =============================================================================

/// Account identified by its encoded address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
}

impl Account {
    /// Bare account with no other field populated.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Persisted transfer whose endpoints reference shared [`Account`] instances.
#[derive(Debug, Clone)]
pub struct Transfer {
    pub id: String,
    pub block_number: u64,
    pub block_hash: BlockHash,
    pub timestamp: DateTime<Utc>,
    pub extrinsic_hash: Option<BlockHash>,
    pub from: Arc<Account>,
    pub to: Arc<Account>,
    pub amount: u128,
    pub fee: Option<u128>,
    pub kind: TransferKind,
    pub remark: Option<String>,
    pub vesting_duration_blocks: Option<u64>,
}

// =============================================================================
// Indexer State
// =============================================================================

/// Indexer cursor tracking progress.
///
/// The cursor tracks the last committed block for each chain. Blocks at or
/// below it are dropped when a source delivers them again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerCursor {
    /// Chain identifier (genesis hash hex).
    pub chain_id: String,
    /// Last fully indexed block number.
    pub last_indexed_block: u64,
    /// Last indexed block hash.
    pub last_indexed_hash: BlockHash,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_hash_hex_roundtrip() {
        let hex = "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";
        let hash = BlockHash::from_hex(hex).unwrap();
        assert_eq!(hash.to_hex(), hex);
    }

    #[test]
    fn account_id_without_prefix() {
        let hex = "d43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d";
        let account = AccountId::from_hex(hex).unwrap();
        assert_eq!(account.to_hex(), format!("0x{}", hex));
    }

    #[test]
    fn hash32_invalid_length() {
        assert!(BlockHash::from_hex("0x1234").is_err());
    }

    #[test]
    fn transfer_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(TransferKind::Vested).unwrap(),
            serde_json::json!("vested")
        );
        assert_eq!(TransferKind::Remark.to_string(), "remark");
    }
}
