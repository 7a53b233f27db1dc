//! Byte encoding of typed values.
//!
//! Integers are little-endian. Strings are UTF-16LE with a NUL terminator.
//! String arrays are a sequence of NUL-terminated UTF-16LE strings followed
//! by one extra NUL. Blobs are stored as-is.

use hivekit_platform::{PlatformResult, PlatformStatus, RawValue};
use hivekit_types::{Value, ValueKind};
use widestring::{U16Str, U16String};

fn push_units(out: &mut Vec<u8>, s: &str) -> PlatformResult<()> {
    // An interior NUL would truncate the string on the way back.
    if s.contains('\0') {
        return Err(PlatformStatus::InvalidParameter);
    }
    for unit in U16String::from_str(s).into_vec() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out.extend_from_slice(&[0, 0]);
    Ok(())
}

fn units(data: &[u8]) -> PlatformResult<Vec<u16>> {
    if data.len() % 2 != 0 {
        return Err(PlatformStatus::InvalidData);
    }
    Ok(data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

fn decode_units(units: &[u16]) -> PlatformResult<String> {
    U16Str::from_slice(units)
        .to_string()
        .map_err(|_| PlatformStatus::InvalidData)
}

/// Encode a value into the tag and bytes the platform stores.
///
/// Strings containing NUL and empty string-array elements cannot be
/// represented and are rejected with `InvalidParameter`.
pub fn encode(value: &Value) -> PlatformResult<RawValue> {
    let data = match value {
        Value::U32(v) => v.to_le_bytes().to_vec(),
        Value::U64(v) => v.to_le_bytes().to_vec(),
        Value::String(s) => {
            let mut out = Vec::with_capacity((s.len() + 1) * 2);
            push_units(&mut out, s)?;
            out
        }
        Value::StringArray(items) => {
            let mut out = Vec::new();
            for item in items {
                if item.is_empty() {
                    return Err(PlatformStatus::InvalidParameter);
                }
                push_units(&mut out, item)?;
            }
            out.extend_from_slice(&[0, 0]);
            out
        }
        Value::Blob(bytes) => bytes.clone(),
    };
    Ok(RawValue::new(value.kind(), data))
}

/// Decode stored bytes according to their tag.
pub fn decode(raw: &RawValue) -> PlatformResult<Value> {
    match raw.kind {
        ValueKind::U32 => {
            let bytes: [u8; 4] = raw
                .data
                .as_slice()
                .try_into()
                .map_err(|_| PlatformStatus::InvalidData)?;
            Ok(Value::U32(u32::from_le_bytes(bytes)))
        }
        ValueKind::U64 => {
            let bytes: [u8; 8] = raw
                .data
                .as_slice()
                .try_into()
                .map_err(|_| PlatformStatus::InvalidData)?;
            Ok(Value::U64(u64::from_le_bytes(bytes)))
        }
        ValueKind::String => {
            let units = units(&raw.data)?;
            // Stored strings are not guaranteed to be terminated.
            let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
            Ok(Value::String(decode_units(&units[..end])?))
        }
        ValueKind::StringArray => {
            let units = units(&raw.data)?;
            let items = units
                .split(|&u| u == 0)
                .take_while(|item| !item.is_empty())
                .map(decode_units)
                .collect::<PlatformResult<Vec<_>>>()?;
            Ok(Value::StringArray(items))
        }
        ValueKind::Blob => Ok(Value::Blob(raw.data.clone())),
    }
}
