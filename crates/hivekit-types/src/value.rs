use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Type tag of a stored value.
///
/// Discriminants are the native type tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ValueKind {
    /// Single text string (`REG_SZ`).
    String = 1,
    /// Opaque bytes (`REG_BINARY`).
    Blob = 3,
    /// Little-endian 32-bit unsigned integer (`REG_DWORD`).
    U32 = 4,
    /// Ordered sequence of strings (`REG_MULTI_SZ`).
    StringArray = 7,
    /// Little-endian 64-bit unsigned integer (`REG_QWORD`).
    U64 = 11,
}

impl ValueKind {
    /// Native numeric tag.
    pub fn tag(self) -> u32 {
        self as u32
    }

    /// Look up a kind by native tag.
    pub fn from_tag(tag: u32) -> Result<Self, TypeError> {
        match tag {
            1 => Ok(Self::String),
            3 => Ok(Self::Blob),
            4 => Ok(Self::U32),
            7 => Ok(Self::StringArray),
            11 => Ok(Self::U64),
            other => Err(TypeError::UnknownTypeTag(other)),
        }
    }

    /// Native type name, e.g. `REG_DWORD`.
    pub fn native_name(self) -> &'static str {
        match self {
            Self::String => "REG_SZ",
            Self::Blob => "REG_BINARY",
            Self::U32 => "REG_DWORD",
            Self::StringArray => "REG_MULTI_SZ",
            Self::U64 => "REG_QWORD",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.native_name())
    }
}

impl FromStr for ValueKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" | "sz" | "reg_sz" => Ok(Self::String),
            "blob" | "binary" | "reg_binary" => Ok(Self::Blob),
            "u32" | "dword" | "reg_dword" => Ok(Self::U32),
            "multi" | "multi_sz" | "reg_multi_sz" => Ok(Self::StringArray),
            "u64" | "qword" | "reg_qword" => Ok(Self::U64),
            _ => Err(TypeError::UnknownValueKind(s.to_string())),
        }
    }
}

/// A named node's typed datum.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    U32(u32),
    U64(u64),
    String(String),
    StringArray(Vec<String>),
    Blob(Vec<u8>),
}

impl Value {
    /// The type tag this value is stored under.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::U32(_) => ValueKind::U32,
            Self::U64(_) => ValueKind::U64,
            Self::String(_) => ValueKind::String,
            Self::StringArray(_) => ValueKind::StringArray,
            Self::Blob(_) => ValueKind::Blob,
        }
    }

    /// Parse textual input as a value of `kind`.
    ///
    /// Integers accept decimal or `0x` hex; string arrays are `,`-separated;
    /// blobs are hex pairs, optionally space-separated.
    pub fn parse_as(kind: ValueKind, input: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidValue {
            kind: kind.native_name(),
            input: input.to_string(),
            reason: reason.to_string(),
        };
        match kind {
            ValueKind::U32 => parse_integer(input)
                .and_then(|v| u32::try_from(v).ok())
                .map(Self::U32)
                .ok_or_else(|| invalid("not a 32-bit integer")),
            ValueKind::U64 => parse_integer(input)
                .map(Self::U64)
                .ok_or_else(|| invalid("not a 64-bit integer")),
            ValueKind::String => Ok(Self::String(input.to_string())),
            ValueKind::StringArray => Ok(Self::StringArray(
                input.split(',').map(str::to_string).collect(),
            )),
            ValueKind::Blob => {
                let digits: String = input.chars().filter(|c| !c.is_whitespace()).collect();
                if !digits.is_ascii() {
                    return Err(invalid("not a hex byte string"));
                }
                if digits.len() % 2 != 0 {
                    return Err(invalid("odd number of hex digits"));
                }
                (0..digits.len())
                    .step_by(2)
                    .map(|i| u8::from_str_radix(&digits[i..i + 2], 16))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Self::Blob)
                    .map_err(|_| invalid("not a hex byte string"))
            }
        }
    }
}

fn parse_integer(input: &str) -> Option<u64> {
    let input = input.trim();
    match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => input.parse().ok(),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U32(v) => write!(f, "{v:#010x} ({v})"),
            Self::U64(v) => write!(f, "{v:#018x} ({v})"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::StringArray(items) => write!(f, "{items:?}"),
            Self::Blob(bytes) => {
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::U64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Self::StringArray(v)
    }
}

impl From<&[&str]> for Value {
    fn from(v: &[&str]) -> Self {
        Self::StringArray(v.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Blob(v.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(Value::from(1u32).kind(), ValueKind::U32);
        assert_eq!(Value::from(1u64).kind(), ValueKind::U64);
        assert_eq!(Value::from("x").kind(), ValueKind::String);
        assert_eq!(Value::from(vec!["a".to_string()]).kind(), ValueKind::StringArray);
        assert_eq!(Value::from(vec![1u8]).kind(), ValueKind::Blob);
    }

    #[test]
    fn tags_round_trip() {
        for kind in [
            ValueKind::String,
            ValueKind::Blob,
            ValueKind::U32,
            ValueKind::StringArray,
            ValueKind::U64,
        ] {
            assert_eq!(ValueKind::from_tag(kind.tag()).unwrap(), kind);
        }
        assert_eq!(ValueKind::from_tag(2), Err(TypeError::UnknownTypeTag(2)));
    }

    #[test]
    fn parse_integers() {
        assert_eq!(
            Value::parse_as(ValueKind::U32, "0xbeefcafe").unwrap(),
            Value::U32(0xbeef_cafe)
        );
        assert_eq!(Value::parse_as(ValueKind::U64, "42").unwrap(), Value::U64(42));
        assert!(Value::parse_as(ValueKind::U32, "0x1_0000_0000").is_err());
        assert!(Value::parse_as(ValueKind::U32, "4294967296").is_err());
    }

    #[test]
    fn parse_string_array_and_blob() {
        assert_eq!(
            Value::parse_as(ValueKind::StringArray, "three,blind,mice").unwrap(),
            Value::from(&["three", "blind", "mice"][..])
        );
        assert_eq!(
            Value::parse_as(ValueKind::Blob, "01 02 ff").unwrap(),
            Value::Blob(vec![1, 2, 0xff])
        );
        assert!(Value::parse_as(ValueKind::Blob, "abc").is_err());
        assert!(Value::parse_as(ValueKind::Blob, "zz").is_err());
    }

    #[test]
    fn display_blob_as_hex() {
        assert_eq!(Value::Blob(vec![0x0a, 0xff]).to_string(), "0a ff");
    }

    #[test]
    fn serde_round_trip() {
        let value = Value::from(&["one", "two"][..]);
        let json = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
