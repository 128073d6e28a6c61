//! Value payloads - one typed scalar per record
//!
//! Each record holds at most one of twelve scalar payloads. In memory
//! the payload is an explicit tagged union, so at most one field is
//! active by construction; on disk it is a sparse row with one nullable
//! column per type.

use crate::id::RecordId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Payload type discriminants. Names double as the storage column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    Str,
}

impl ValueKind {
    /// Get the string representation of the payload kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::U8 => "u8",
            ValueKind::I8 => "i8",
            ValueKind::U16 => "u16",
            ValueKind::I16 => "i16",
            ValueKind::U32 => "u32",
            ValueKind::I32 => "i32",
            ValueKind::U64 => "u64",
            ValueKind::I64 => "i64",
            ValueKind::F32 => "f32",
            ValueKind::F64 => "f64",
            ValueKind::Str => "str",
        }
    }

    /// Get all payload kinds, in storage column order
    pub fn all() -> &'static [ValueKind] {
        &[
            ValueKind::Bool,
            ValueKind::U8,
            ValueKind::I8,
            ValueKind::U16,
            ValueKind::I16,
            ValueKind::U32,
            ValueKind::I32,
            ValueKind::U64,
            ValueKind::I64,
            ValueKind::F32,
            ValueKind::F64,
            ValueKind::Str,
        ]
    }
}

impl FromStr for ValueKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bool" | "boolean" => Ok(ValueKind::Bool),
            "u8" => Ok(ValueKind::U8),
            "i8" => Ok(ValueKind::I8),
            "u16" => Ok(ValueKind::U16),
            "i16" => Ok(ValueKind::I16),
            "u32" => Ok(ValueKind::U32),
            "i32" => Ok(ValueKind::I32),
            "u64" => Ok(ValueKind::U64),
            "i64" => Ok(ValueKind::I64),
            "f32" | "float" => Ok(ValueKind::F32),
            "f64" | "double" => Ok(ValueKind::F64),
            "str" | "string" | "text" => Ok(ValueKind::Str),
            _ => Err(Error::Parse(format!("Unknown value kind: {}", s))),
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed scalar payload - exactly one variant is active.
///
/// The storage layer persists this as a sparse row (one nullable column
/// per variant); the enum makes the at-most-one-active-field invariant
/// hold by construction on the Rust side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Bool(bool),
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
}

impl Value {
    /// The kind of this payload
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::U8(_) => ValueKind::U8,
            Value::I8(_) => ValueKind::I8,
            Value::U16(_) => ValueKind::U16,
            Value::I16(_) => ValueKind::I16,
            Value::U32(_) => ValueKind::U32,
            Value::I32(_) => ValueKind::I32,
            Value::U64(_) => ValueKind::U64,
            Value::I64(_) => ValueKind::I64,
            Value::F32(_) => ValueKind::F32,
            Value::F64(_) => ValueKind::F64,
            Value::Str(_) => ValueKind::Str,
        }
    }

    /// Parse a textual rendering into the given payload kind
    pub fn parse_as(kind: ValueKind, s: &str) -> Result<Value> {
        fn parse<T: FromStr>(kind: ValueKind, s: &str) -> Result<T> {
            s.parse()
                .map_err(|_| Error::Parse(format!("Invalid {} literal: {}", kind, s)))
        }

        Ok(match kind {
            ValueKind::Bool => Value::Bool(parse(kind, s)?),
            ValueKind::U8 => Value::U8(parse(kind, s)?),
            ValueKind::I8 => Value::I8(parse(kind, s)?),
            ValueKind::U16 => Value::U16(parse(kind, s)?),
            ValueKind::I16 => Value::I16(parse(kind, s)?),
            ValueKind::U32 => Value::U32(parse(kind, s)?),
            ValueKind::I32 => Value::I32(parse(kind, s)?),
            ValueKind::U64 => Value::U64(parse(kind, s)?),
            ValueKind::I64 => Value::I64(parse(kind, s)?),
            ValueKind::F32 => Value::F32(parse(kind, s)?),
            ValueKind::F64 => Value::F64(parse(kind, s)?),
            ValueKind::Str => Value::Str(s.to_string()),
        })
    }

    // ========== Sparse-row accessors ==========
    // One per storage column; for any payload exactly one returns Some.

    pub(crate) fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub(crate) fn as_u8(&self) -> Option<u8> {
        match self {
            Value::U8(v) => Some(*v),
            _ => None,
        }
    }

    pub(crate) fn as_i8(&self) -> Option<i8> {
        match self {
            Value::I8(v) => Some(*v),
            _ => None,
        }
    }

    pub(crate) fn as_u16(&self) -> Option<u16> {
        match self {
            Value::U16(v) => Some(*v),
            _ => None,
        }
    }

    pub(crate) fn as_i16(&self) -> Option<i16> {
        match self {
            Value::I16(v) => Some(*v),
            _ => None,
        }
    }

    pub(crate) fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub(crate) fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub(crate) fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub(crate) fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub(crate) fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub(crate) fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Decode the sparse payload columns of a row, starting at column
    /// `base`, in the fixed order bool..str. The single non-NULL column
    /// determines the variant; an all-NULL row decodes to `None`.
    pub(crate) fn from_row(row: &rusqlite::Row, base: usize) -> rusqlite::Result<Option<Value>> {
        if let Some(v) = row.get::<_, Option<bool>>(base)? {
            return Ok(Some(Value::Bool(v)));
        }
        if let Some(v) = row.get::<_, Option<u8>>(base + 1)? {
            return Ok(Some(Value::U8(v)));
        }
        if let Some(v) = row.get::<_, Option<i8>>(base + 2)? {
            return Ok(Some(Value::I8(v)));
        }
        if let Some(v) = row.get::<_, Option<u16>>(base + 3)? {
            return Ok(Some(Value::U16(v)));
        }
        if let Some(v) = row.get::<_, Option<i16>>(base + 4)? {
            return Ok(Some(Value::I16(v)));
        }
        if let Some(v) = row.get::<_, Option<u32>>(base + 5)? {
            return Ok(Some(Value::U32(v)));
        }
        if let Some(v) = row.get::<_, Option<i32>>(base + 6)? {
            return Ok(Some(Value::I32(v)));
        }
        if let Some(v) = row.get::<_, Option<u64>>(base + 7)? {
            return Ok(Some(Value::U64(v)));
        }
        if let Some(v) = row.get::<_, Option<i64>>(base + 8)? {
            return Ok(Some(Value::I64(v)));
        }
        if let Some(v) = row.get::<_, Option<f32>>(base + 9)? {
            return Ok(Some(Value::F32(v)));
        }
        if let Some(v) = row.get::<_, Option<f64>>(base + 10)? {
            return Ok(Some(Value::F64(v)));
        }
        if let Some(v) = row.get::<_, Option<String>>(base + 11)? {
            return Ok(Some(Value::Str(v)));
        }
        Ok(None)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::U8(v) => write!(f, "{}", v),
            Value::I8(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{}", v),
        }
    }
}

/// One addressable record: an identifier plus its optional payload.
///
/// A record may carry no payload at all (zero populated columns); a
/// read distinguishes that from an absent record, which is an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRecord {
    /// Unique identifier of the record
    pub id: RecordId,
    /// The single typed payload, if any
    pub payload: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in ValueKind::all() {
            let s = kind.as_str();
            let parsed: ValueKind = s.parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(Value::Bool(true).kind(), ValueKind::Bool);
        assert_eq!(Value::U64(7).kind(), ValueKind::U64);
        assert_eq!(Value::Str("x".into()).kind(), ValueKind::Str);
    }

    #[test]
    fn test_single_accessor_active() {
        let v = Value::U32(42);
        assert_eq!(v.as_u32(), Some(42));
        assert_eq!(v.as_bool(), None);
        assert_eq!(v.as_u64(), None);
        assert_eq!(v.as_str(), None);

        let s = Value::Str("likes".into());
        assert_eq!(s.as_str(), Some("likes"));
        assert_eq!(s.as_u32(), None);
    }

    #[test]
    fn test_parse_as() {
        assert_eq!(Value::parse_as(ValueKind::U32, "42").unwrap(), Value::U32(42));
        assert_eq!(
            Value::parse_as(ValueKind::Bool, "true").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            Value::parse_as(ValueKind::Str, "hello").unwrap(),
            Value::Str("hello".into())
        );
        assert!(Value::parse_as(ValueKind::U8, "300").is_err());
    }
}
