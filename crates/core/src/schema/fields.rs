//! Field parsers shared by the schema decoders.
//!
//! Payloads come from dynamic SCALE-to-JSON conversion, so the same logical
//! value can show up in several shapes depending on node and metadata
//! version. These helpers accept all of them.

use crate::error::{DomainError, DomainResult};
use crate::models::AccountId;

// =============================================================================
// Field access
// =============================================================================

/// Look up a named field, trying each key in order.
pub fn named<'a>(data: &'a serde_json::Value, keys: &[&str]) -> Option<&'a serde_json::Value> {
    keys.iter().find_map(|key| data.get(*key))
}

/// Parse a required named field.
pub fn required<T>(
    data: &serde_json::Value,
    keys: &[&str],
    parser: fn(&serde_json::Value) -> Option<T>,
) -> DomainResult<T> {
    named(data, keys)
        .and_then(parser)
        .ok_or_else(|| DomainError::DecodingError(format!("missing or invalid field '{}'", keys[0])))
}

/// Require an object whose field names are exactly one alias per entry of
/// `fields`.
pub fn expect_struct<'a>(
    data: &'a serde_json::Value,
    fields: &[&[&str]],
) -> DomainResult<&'a serde_json::Map<String, serde_json::Value>> {
    let obj = data
        .as_object()
        .ok_or_else(|| DomainError::DecodingError("expected a struct".into()))?;

    if obj.len() != fields.len() {
        return Err(DomainError::DecodingError(format!(
            "expected {} fields, got {}",
            fields.len(),
            obj.len()
        )));
    }
    for aliases in fields {
        if !aliases.iter().any(|k| obj.contains_key(*k)) {
            return Err(DomainError::DecodingError(format!(
                "missing field '{}'",
                aliases[0]
            )));
        }
    }
    Ok(obj)
}

/// Require a tuple of exactly `arity` elements.
pub fn expect_tuple(data: &serde_json::Value, arity: usize) -> DomainResult<&[serde_json::Value]> {
    let items = data
        .as_array()
        .ok_or_else(|| DomainError::DecodingError("expected a tuple".into()))?;

    if items.len() != arity {
        return Err(DomainError::DecodingError(format!(
            "expected {}-tuple, got {} elements",
            arity,
            items.len()
        )));
    }
    Ok(items)
}

/// Parse a positional element of a tuple.
pub fn element<T>(
    items: &[serde_json::Value],
    index: usize,
    parser: fn(&serde_json::Value) -> Option<T>,
) -> DomainResult<T> {
    items
        .get(index)
        .and_then(parser)
        .ok_or_else(|| DomainError::DecodingError(format!("invalid tuple element {}", index)))
}

// =============================================================================
// Account parsing
// =============================================================================

/// Parse an account ID from various JSON representations.
///
/// Handles:
/// - Hex string: `"0x1234..."`
/// - Wrapped object: `{ "Id": "0x..." }`
/// - Array wrapper: `["0x..."]`
/// - Byte array: `[b0, b1, ..., b31]`
pub fn parse_account(value: &serde_json::Value) -> Option<AccountId> {
    match value {
        serde_json::Value::String(s) => {
            let hex_str = s.strip_prefix("0x").unwrap_or(s);
            let bytes = hex::decode(hex_str).ok()?;
            let arr: [u8; 32] = bytes.try_into().ok()?;
            Some(AccountId(arr))
        }
        serde_json::Value::Object(obj) => obj
            .get("Id")
            .or_else(|| obj.get("id"))
            .and_then(parse_account),
        serde_json::Value::Array(arr) => {
            if arr.len() == 1 {
                return parse_account(&arr[0]);
            }
            if arr.len() != 32 {
                return None;
            }
            let mut bytes = [0u8; 32];
            for (i, v) in arr.iter().enumerate() {
                bytes[i] = u8::try_from(v.as_u64()?).ok()?;
            }
            Some(AccountId(bytes))
        }
        _ => None,
    }
}

// =============================================================================
// Numeric parsing
// =============================================================================

/// Parse an amount (u128) from JSON.
///
/// JSON numbers stop at u64 while balances are u128, so decimal strings are
/// accepted too.
pub fn parse_amount(value: &serde_json::Value) -> Option<u128> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().map(u128::from),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Parse a u64 from JSON.
pub fn parse_u64(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

// =============================================================================
// Bytes parsing
// =============================================================================

/// Parse arbitrary bytes from JSON.
///
/// Handles:
/// - Hex string: `"0x1234..."`
/// - Byte array: `[b0, b1, ...]`
/// - Single byte: `b0` (a one-element array unwrapped by the SCALE conversion)
pub fn parse_bytes(value: &serde_json::Value) -> Option<Vec<u8>> {
    match value {
        serde_json::Value::String(s) => {
            let hex_str = s.strip_prefix("0x").unwrap_or(s);
            hex::decode(hex_str).ok()
        }
        serde_json::Value::Array(arr) => arr
            .iter()
            .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect(),
        serde_json::Value::Number(n) => n.as_u64().and_then(|b| u8::try_from(b).ok()).map(|b| vec![b]),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
