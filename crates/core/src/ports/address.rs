//! Port trait for chain-specific address encoding.
//!
//! Every extractor passes raw account ids through an [`AddressCodec`] before
//! they enter the data model. [`Ss58Codec`] is the Substrate implementation.

use blake2::{Blake2b512, Digest};

use crate::models::AccountId;

/// Joystream SS58 network prefix.
pub const JOYSTREAM_SS58_PREFIX: u16 = 126;

const SS58_CHECKSUM_PREFIX: &[u8] = b"SS58PRE";
const SS58_CHECKSUM_LEN: usize = 2;

/// Deterministic encoding of raw account ids into textual addresses.
///
/// Treated as injective: two different account ids never encode to the
/// same address.
pub trait AddressCodec: Send + Sync {
    fn encode(&self, account: &AccountId) -> String;
}

/// SS58 address encoding with a fixed network prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ss58Codec {
    prefix: u16,
}

impl Ss58Codec {
    /// Create a codec for `prefix`.
    ///
    /// Returns `None` for prefixes outside the 14-bit SS58 range.
    pub fn new(prefix: u16) -> Option<Self> {
        (prefix < 16_384).then_some(Self { prefix })
    }

    pub fn prefix(&self) -> u16 {
        self.prefix
    }

    fn prefix_bytes(&self) -> Vec<u8> {
        let ident = self.prefix;
        match ident {
            0..=63 => vec![ident as u8],
            _ => {
                let first = ((ident & 0b0000_0000_1111_1100) as u8 >> 2) | 0b0100_0000;
                let second = ((ident >> 8) as u8) | (((ident & 0b0000_0000_0000_0011) as u8) << 6);
                vec![first, second]
            }
        }
    }
}

impl Default for Ss58Codec {
    fn default() -> Self {
        Self {
            prefix: JOYSTREAM_SS58_PREFIX,
        }
    }
}

impl AddressCodec for Ss58Codec {
    fn encode(&self, account: &AccountId) -> String {
        let mut payload = self.prefix_bytes();
        payload.extend_from_slice(account.as_bytes());

        let mut hasher = Blake2b512::new();
        hasher.update(SS58_CHECKSUM_PREFIX);
        hasher.update(&payload);
        let checksum = hasher.finalize();

        payload.extend_from_slice(&checksum[..SS58_CHECKSUM_LEN]);
        bs58::encode(payload).into_string()
    }
}
