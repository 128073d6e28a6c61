//! Record identifiers - fixed 16-byte binary ids
//!
//! Every value record is addressed by a `RecordId`, a 16-byte
//! universally-unique identifier. Identifiers bind to SQLite as 16-byte
//! BLOBs; reads reject blobs of any other length.

use crate::{Error, Result};
use rusqlite::ToSql;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Fixed-size binary identifier for value records and link endpoints.
///
/// This identifier serves as the primary key for:
/// - Value records
/// - Link endpoints (source, key, target)
///
/// Uniqueness relies on UUID-class random generation; the store only
/// enforces it post hoc through the primary-key constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId([u8; 16]);

impl RecordId {
    /// Byte length of every identifier
    pub const LEN: usize = 16;

    /// Generate a fresh random identifier (UUID v4)
    pub fn random() -> Self {
        Self(*Uuid::new_v4().as_bytes())
    }

    /// Create an identifier from exactly 16 bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Create an identifier from a byte slice, rejecting any length but 16
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; 16] = bytes.try_into().map_err(|_| {
            Error::MalformedIdentifier(format!(
                "expected {} bytes, got {}",
                Self::LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// Raw bytes of the identifier
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_bytes(self.0))
    }
}

impl FromStr for RecordId {
    type Err = Error;

    /// Parse from the hyphenated UUID form or plain 32-digit hex
    fn from_str(s: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(s)
            .map_err(|e| Error::MalformedIdentifier(format!("{:?}: {}", s, e)))?;
        Ok(Self(*uuid.as_bytes()))
    }
}

impl ToSql for RecordId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(ValueRef::Blob(&self.0)))
    }
}

impl FromSql for RecordId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let bytes = value.as_blob()?;
        let blob_size = bytes.len();
        if blob_size != Self::LEN {
            return Err(FromSqlError::InvalidBlobSize {
                expected_size: Self::LEN,
                blob_size,
            });
        }
        let mut array = [0; 16];
        array.copy_from_slice(bytes);
        Ok(Self(array))
    }
}

impl Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_roundtrip() {
        let id = RecordId::from_bytes([0x11; 16]);
        assert_eq!(id.as_bytes(), &[0x11; 16]);
        assert_eq!(RecordId::from_slice(id.as_bytes()).unwrap(), id);
    }

    #[test]
    fn test_display_parse_roundtrip() {
        let id = RecordId::random();
        let parsed: RecordId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_random_ids_differ() {
        assert_ne!(RecordId::random(), RecordId::random());
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        let err = RecordId::from_slice(&[0u8; 15]).unwrap_err();
        assert!(matches!(err, Error::MalformedIdentifier(_)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("not-an-id".parse::<RecordId>().is_err());
    }
}
