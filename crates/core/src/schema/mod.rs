//! Versioned payload decoders.
//!
//! Every logical call or event name owns a [`VersionedSchema`]: an ordered
//! table of rows, one per runtime version the payload layout changed in.
//! Rows are only ever appended. Decoding picks the first row (oldest first)
//! whose predicate accepts the block's spec version.
//!
//! ```ignore
//! let transfer = schema::balances::TRANSFER.decode(&Payload::event(&block, &event))?;
//! ```

pub mod balances;
pub mod fields;
pub mod members;
pub mod system;
pub mod vesting;

use crate::error::{DomainError, DomainResult};
use crate::ports::{RawBlock, RawCall, RawEvent};

/// A call or event payload together with the runtime version it was produced
/// under.
#[derive(Debug, Clone, Copy)]
pub struct Payload<'a> {
    pub spec_version: u32,
    pub args: &'a serde_json::Value,
}

impl<'a> Payload<'a> {
    pub fn event(block: &RawBlock, event: &'a RawEvent) -> Self {
        Self {
            spec_version: block.spec_version,
            args: &event.args,
        }
    }

    pub fn call(block: &RawBlock, call: &'a RawCall) -> Self {
        Self {
            spec_version: block.spec_version,
            args: &call.args,
        }
    }
}

/// One historical layout of a payload.
pub struct SchemaVersion<T: 'static> {
    /// Version label, e.g. "v1000".
    pub label: &'static str,
    /// Whether a payload from this spec version uses this layout.
    pub is: fn(u32) -> bool,
    /// Decode the exact field set of this layout.
    pub decode: fn(&serde_json::Value) -> DomainResult<T>,
}

/// Append-only decoder table for one logical name.
pub struct VersionedSchema<T: 'static> {
    pub name: &'static str,
    pub versions: &'static [SchemaVersion<T>],
}

impl<T> VersionedSchema<T> {
    /// Row matching the payload's spec version, oldest first.
    pub fn resolve(&self, spec_version: u32) -> Option<&SchemaVersion<T>> {
        self.versions.iter().find(|v| (v.is)(spec_version))
    }

    /// Whether any row accepts this spec version.
    pub fn is_supported(&self, spec_version: u32) -> bool {
        self.resolve(spec_version).is_some()
    }

    /// Decode a payload with the first matching row.
    ///
    /// Fails with [`DomainError::UnsupportedSpecVersion`] when no row matches
    /// and with [`DomainError::LayoutMismatch`] when the matching row rejects
    /// the payload. Both are fatal: open-ended predicates keep matching newer
    /// runtimes, so a rejected payload means a row is missing from the table.
    pub fn decode(&self, payload: &Payload<'_>) -> DomainResult<T> {
        let version =
            self.resolve(payload.spec_version)
                .ok_or_else(|| DomainError::UnsupportedSpecVersion {
                    name: self.name.to_string(),
                    spec_version: payload.spec_version,
                })?;

        (version.decode)(payload.args).map_err(|e| match e {
            DomainError::DecodingError(reason) => DomainError::LayoutMismatch {
                name: self.name.to_string(),
                version: version.label,
                spec_version: payload.spec_version,
                reason,
            },
            other => other,
        })
    }
}

// =============================================================================
// Runtime versions
// =============================================================================

/// First runtime version the indexer knows about.
pub const V1000: u32 = 1000;
/// Runtime that added the payment to member remarks.
pub const V2001: u32 = 2001;

pub(crate) fn since_v1000(spec_version: u32) -> bool {
    spec_version >= V1000
}

pub(crate) fn v1000_until_v2001(spec_version: u32) -> bool {
    (V1000..V2001).contains(&spec_version)
}

pub(crate) fn since_v2001(spec_version: u32) -> bool {
    spec_version >= V2001
}
