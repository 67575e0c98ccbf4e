//! Conversion of dynamically decoded SCALE values into the JSON shapes the
//! schema decoders accept, plus the few raw-byte fallbacks the adapter needs.

use subxt::ext::scale_value::{Composite, Primitive, Value, ValueDef};

use tally_core::models::AccountId;

// =============================================================================
// SCALE Value to JSON conversion
// =============================================================================

/// Convert a Composite to a JSON value.
pub fn composite_to_json<T>(composite: &Composite<T>) -> serde_json::Value {
    match composite {
        Composite::Unnamed(values) => {
            // Check if this looks like a byte array (e.g., AccountId, Hash)
            if let Some(hex_str) = try_as_byte_array(values) {
                return serde_json::Value::String(hex_str);
            }
            // Unwrap single-element tuples (common for newtype wrappers like AccountId)
            if values.len() == 1 {
                return value_to_json(&values[0]);
            }
            serde_json::Value::Array(values.iter().map(value_to_json).collect())
        }
        Composite::Named(fields) => {
            let obj: serde_json::Map<String, serde_json::Value> = fields
                .iter()
                .map(|(name, v)| (name.clone(), value_to_json(v)))
                .collect();
            serde_json::Value::Object(obj)
        }
    }
}

/// Try to interpret an unnamed composite as a byte array (AccountId, Hash, etc).
/// Returns a hex string if the composite looks like a byte array, None otherwise.
fn try_as_byte_array<T>(values: &[Value<T>]) -> Option<String> {
    let len = values.len();
    if len != 32 && len != 20 && len != 64 {
        return None;
    }

    let mut bytes = Vec::with_capacity(len);
    for value in values {
        match &value.value {
            ValueDef::Primitive(Primitive::U128(n)) => bytes.push(u8::try_from(*n).ok()?),
            _ => return None,
        }
    }

    Some(format!("0x{}", hex::encode(bytes)))
}

/// Convert a Value to a JSON value.
pub fn value_to_json<T>(value: &Value<T>) -> serde_json::Value {
    value_def_to_json(&value.value)
}

/// Convert a ValueDef to a JSON value.
fn value_def_to_json<T>(value: &ValueDef<T>) -> serde_json::Value {
    match value {
        ValueDef::Composite(composite) => composite_to_json(composite),
        ValueDef::Variant(variant) => {
            let variant_name = &variant.name;
            let inner = composite_to_json(&variant.values);

            match variant_name.as_str() {
                "None" => serde_json::Value::Null,
                // Option payloads and MultiAddress::Id are transparent
                "Some" | "Id" => match inner {
                    serde_json::Value::Array(mut arr) if arr.len() == 1 => arr.remove(0),
                    other => other,
                },
                _ => {
                    let mut map = serde_json::Map::new();
                    map.insert(variant_name.clone(), inner);
                    serde_json::Value::Object(map)
                }
            }
        }
        ValueDef::Primitive(primitive) => primitive_to_json(primitive),
        ValueDef::BitSequence(bits) => serde_json::Value::String(format!("{:?}", bits)),
    }
}

/// Convert a Primitive to a JSON value.
///
/// Unsigned values that fit a u64 stay numbers; larger ones (balances) become
/// decimal strings so no precision is lost.
fn primitive_to_json(primitive: &Primitive) -> serde_json::Value {
    match primitive {
        Primitive::Bool(b) => serde_json::Value::Bool(*b),
        Primitive::Char(c) => serde_json::Value::String(c.to_string()),
        Primitive::String(s) => serde_json::Value::String(s.clone()),
        Primitive::U128(n) => match u64::try_from(*n) {
            Ok(small) => serde_json::Value::from(small),
            Err(_) => serde_json::Value::String(n.to_string()),
        },
        Primitive::I128(n) => serde_json::Value::String(n.to_string()),
        Primitive::U256(n) => serde_json::Value::String(format!("{:?}", n)),
        Primitive::I256(n) => serde_json::Value::String(format!("{:?}", n)),
    }
}

// =============================================================================
// Raw bytes
// =============================================================================

/// Account id from the encoded address of a signed extrinsic.
///
/// Accepts a bare 32-byte `AccountId32` and a `MultiAddress::Id` (variant
/// index 0 followed by 32 bytes).
pub fn signer_from_address(bytes: &[u8]) -> Option<AccountId> {
    let raw = match bytes {
        [0, rest @ ..] if rest.len() == 32 => rest,
        _ if bytes.len() == 32 => bytes,
        _ => return None,
    };
    let arr: [u8; 32] = raw.try_into().ok()?;
    Some(AccountId(arr))
}

/// Try to decode a Compact<u64> from bytes.
pub fn try_decode_compact_u64(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }

    let first = bytes[0];
    let mode = first & 0b11;

    match mode {
        0b00 => Some((first >> 2) as u64),
        0b01 => {
            if bytes.len() < 2 {
                return None;
            }
            let value = u16::from_le_bytes([bytes[0], bytes[1]]) >> 2;
            Some(value as u64)
        }
        0b10 => {
            if bytes.len() < 4 {
                return None;
            }
            let value = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) >> 2;
            Some(value as u64)
        }
        0b11 => {
            let num_bytes = ((first >> 2) + 4) as usize;
            if bytes.len() < 1 + num_bytes || num_bytes > 8 {
                return None;
            }
            let mut value_bytes = [0u8; 8];
            value_bytes[..num_bytes].copy_from_slice(&bytes[1..1 + num_bytes]);
            Some(u64::from_le_bytes(value_bytes))
        }
        _ => None,
    }
}

/// Parse timestamp from debug string.
pub fn parse_timestamp_from_debug(s: &str) -> Option<u64> {
    const MIN_TIMESTAMP_MS: u64 = 1_577_836_800_000;
    const MAX_TIMESTAMP_MS: u64 = 2_524_608_000_000;

    for part in s.split(|c: char| !c.is_ascii_digit()) {
        if let Ok(num) = part.parse::<u64>()
            && (MIN_TIMESTAMP_MS..=MAX_TIMESTAMP_MS).contains(&num)
        {
            return Some(num);
        }
    }
    None
}
