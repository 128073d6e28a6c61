//! SQLite storage implementation

use crate::id::RecordId;
use crate::link::{Link, LinkHandle, StoredLink};
use crate::migration::{self, IntegrityReport, Migrations};
use crate::value::{Value, ValueRecord};
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use std::path::Path;

const UPSERT_VALUE: &str = r#"
INSERT INTO `values` (uuid, bool, u8, i8, u16, i16, u32, i32, u64, i64, f32, f64, str)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
ON CONFLICT(uuid)
DO UPDATE
SET bool=excluded.bool, u8=excluded.u8, i8=excluded.i8, u16=excluded.u16, i16=excluded.i16,
    u32=excluded.u32, i32=excluded.i32, u64=excluded.u64, i64=excluded.i64,
    f32=excluded.f32, f64=excluded.f64, str=excluded.str
"#;

const INSERT_VALUE: &str = r#"
INSERT INTO `values` (uuid, bool, u8, i8, u16, i16, u32, i32, u64, i64, f32, f64, str)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
"#;

const SELECT_PAYLOAD: &str =
    "SELECT bool, u8, i8, u16, i16, u32, i32, u64, i64, f32, f64, str FROM `values` WHERE uuid = ?1";

const SELECT_LINK: &str = "SELECT rowid, source_uuid, key_uuid, target_uuid FROM links";

/// SQLite-backed store for the value/link graph
pub struct GraphStore {
    conn: Connection,
}

impl GraphStore {
    /// Open a store file (creates if it doesn't exist) and bring it to
    /// the latest schema generation. A failed migration step aborts the
    /// open without advancing the recorded generation.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    /// Wrap an existing connection, migrating it to the latest generation
    pub fn from_connection(mut conn: Connection) -> Result<Self> {
        Migrations::new(&mut conn)?.run_to_latest()?;
        Ok(Self { conn })
    }

    /// Schema generation the store currently records
    pub fn generation(&self) -> Result<i32> {
        migration::stored_generation(&self.conn)
    }

    // ========== Value Operations ==========

    /// Insert or overwrite a value record.
    ///
    /// Upsert is the store's write policy: a second `put` under the
    /// same identifier replaces the payload. Use [`GraphStore::insert`]
    /// for insert-only semantics.
    pub fn put(&self, id: &RecordId, value: &Value) -> Result<()> {
        self.conn.execute(
            UPSERT_VALUE,
            params![
                id,
                value.as_bool(),
                value.as_u8(),
                value.as_i8(),
                value.as_u16(),
                value.as_i16(),
                value.as_u32(),
                value.as_i32(),
                value.as_u64(),
                value.as_i64(),
                value.as_f32(),
                value.as_f64(),
                value.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Insert a value record, failing with `DuplicateIdentifier` when
    /// the identifier is already present
    pub fn insert(&self, id: &RecordId, value: &Value) -> Result<()> {
        let result = self.conn.execute(
            INSERT_VALUE,
            params![
                id,
                value.as_bool(),
                value.as_u8(),
                value.as_i8(),
                value.as_u16(),
                value.as_i16(),
                value.as_u32(),
                value.as_i32(),
                value.as_u64(),
                value.as_i64(),
                value.as_f32(),
                value.as_f64(),
                value.as_str(),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::DuplicateIdentifier(*id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get a value record by identifier, failing with `NotFound` when
    /// no record exists for it
    pub fn get(&self, id: &RecordId) -> Result<ValueRecord> {
        let payload = self
            .conn
            .query_row(SELECT_PAYLOAD, [id], |row| Value::from_row(row, 0))
            .optional()?;

        match payload {
            Some(payload) => Ok(ValueRecord { id: *id, payload }),
            None => Err(Error::NotFound(*id)),
        }
    }

    /// Check whether a record exists for the identifier
    pub fn contains(&self, id: &RecordId) -> Result<bool> {
        let row = self
            .conn
            .query_row("SELECT 1 FROM `values` WHERE uuid = ?1", [id], |_| Ok(()))
            .optional()?;
        Ok(row.is_some())
    }

    /// Delete a value record.
    ///
    /// Links referencing the identifier are deliberately left in place;
    /// they become dangling and remain readable.
    pub fn delete(&self, id: &RecordId) -> Result<()> {
        self.conn
            .execute("DELETE FROM `values` WHERE uuid = ?1", [id])?;
        Ok(())
    }

    /// Find identifiers whose string payload equals `text` (backed by
    /// the string index)
    pub fn find_by_string(&self, text: &str) -> Result<Vec<RecordId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid FROM `values` WHERE str = ?1")?;

        let ids = stmt
            .query_map([text], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(ids)
    }

    /// Count all value records
    pub fn count_values(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM `values`", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Link Operations ==========

    /// Add a link.
    ///
    /// Endpoints are not validated against stored value records:
    /// dangling links are accepted by design, and identical tuples may
    /// be added repeatedly. Each insertion gets its own handle.
    pub fn add_link(&self, link: &Link) -> Result<LinkHandle> {
        self.conn.execute(
            "INSERT INTO links (source_uuid, key_uuid, target_uuid) VALUES (?1, ?2, ?3)",
            params![link.source, link.key, link.target],
        )?;
        Ok(LinkHandle(self.conn.last_insert_rowid()))
    }

    /// Remove one link insertion by its handle
    pub fn remove_link(&self, handle: LinkHandle) -> Result<()> {
        self.conn
            .execute("DELETE FROM links WHERE rowid = ?1", [handle.0])?;
        Ok(())
    }

    /// Get outgoing links of a source
    pub fn links_from(&self, source: &RecordId) -> Result<Vec<StoredLink>> {
        let sql = format!("{} WHERE source_uuid = ?1", SELECT_LINK);
        let mut stmt = self.conn.prepare(&sql)?;

        let links = stmt
            .query_map([source], Self::row_to_link)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(links)
    }

    /// Get outgoing links of a source carrying a specific key
    pub fn links_from_with_key(&self, source: &RecordId, key: &RecordId) -> Result<Vec<StoredLink>> {
        let sql = format!("{} WHERE source_uuid = ?1 AND key_uuid = ?2", SELECT_LINK);
        let mut stmt = self.conn.prepare(&sql)?;

        let links = stmt
            .query_map([source, key], Self::row_to_link)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(links)
    }

    /// Get all links labeled with a key
    pub fn links_by_key(&self, key: &RecordId) -> Result<Vec<StoredLink>> {
        let sql = format!("{} WHERE key_uuid = ?1", SELECT_LINK);
        let mut stmt = self.conn.prepare(&sql)?;

        let links = stmt
            .query_map([key], Self::row_to_link)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(links)
    }

    /// Get incoming links to a target (backed by the target index)
    pub fn links_to(&self, target: &RecordId) -> Result<Vec<StoredLink>> {
        let sql = format!("{} WHERE target_uuid = ?1", SELECT_LINK);
        let mut stmt = self.conn.prepare(&sql)?;

        let links = stmt
            .query_map([target], Self::row_to_link)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(links)
    }

    /// Count all link records
    pub fn count_links(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM links", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Helper to convert a row to a StoredLink
    fn row_to_link(row: &rusqlite::Row) -> rusqlite::Result<StoredLink> {
        Ok(StoredLink {
            handle: LinkHandle(row.get(0)?),
            link: Link {
                source: row.get(1)?,
                key: row.get(2)?,
                target: row.get(3)?,
            },
        })
    }

    // ========== Bulk Operations ==========

    /// Begin a transaction for bulk operations
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", [])?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&mut self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&mut self) -> Result<()> {
        self.conn.execute("ROLLBACK", [])?;
        Ok(())
    }

    /// Run the best-effort link endpoint check against the live store
    pub fn check_integrity(&self) -> Result<IntegrityReport> {
        migration::check_links(&self.conn)
    }

    /// Get store statistics
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            generation: self.generation()?,
            values: self.count_values()?,
            links: self.count_links()?,
        })
    }
}

/// Store statistics
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub generation: i32,
    pub values: usize,
    pub links: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Store Statistics:")?;
        writeln!(f, "  Generation: {}", self.generation)?;
        writeln!(f, "  Values: {}", self.values)?;
        writeln!(f, "  Links: {}", self.links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LATEST_GENERATION;

    fn test_store() -> GraphStore {
        GraphStore::open_in_memory().unwrap()
    }

    fn id(byte: u8) -> RecordId {
        RecordId::from_bytes([byte; 16])
    }

    #[test]
    fn test_put_get_roundtrip_all_kinds() {
        let store = test_store();
        let payloads = vec![
            Value::Bool(true),
            Value::U8(200),
            Value::I8(-5),
            Value::U16(40_000),
            Value::I16(-20_000),
            Value::U32(3_000_000_000),
            Value::I32(-7),
            Value::U64(42),
            Value::I64(i64::MIN),
            Value::F32(1.5),
            Value::F64(-0.25),
            Value::Str("hello".into()),
        ];

        for value in payloads {
            let id = RecordId::random();
            store.put(&id, &value).unwrap();
            let record = store.get(&id).unwrap();
            assert_eq!(record.id, id);
            assert_eq!(record.payload, Some(value));
        }
    }

    #[test]
    fn test_put_overwrites() {
        let store = test_store();
        let id = RecordId::random();

        store.put(&id, &Value::U32(1)).unwrap();
        store.put(&id, &Value::Str("now a string".into())).unwrap();

        let record = store.get(&id).unwrap();
        assert_eq!(record.payload, Some(Value::Str("now a string".into())));
        assert_eq!(store.count_values().unwrap(), 1);
    }

    #[test]
    fn test_insert_rejects_duplicate() {
        let store = test_store();
        let id = RecordId::random();

        store.insert(&id, &Value::Bool(true)).unwrap();
        let err = store.insert(&id, &Value::Bool(false)).unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentifier(d) if d == id));

        // The original payload survives the rejected insert
        assert_eq!(store.get(&id).unwrap().payload, Some(Value::Bool(true)));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = test_store();
        let err = store.get(&id(0x99)).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_delete_does_not_cascade_to_links() {
        let store = test_store();
        let a = id(0x0a);
        let b = id(0x0b);

        store.put(&a, &Value::U32(1)).unwrap();
        store.put(&b, &Value::U32(2)).unwrap();
        store.add_link(&Link::new(a, b)).unwrap();

        store.delete(&a).unwrap();

        assert!(matches!(store.get(&a).unwrap_err(), Error::NotFound(_)));
        // The link survives as a dangling edge
        assert_eq!(store.links_from(&a).unwrap().len(), 1);
        assert_eq!(store.links_to(&b).unwrap().len(), 1);
    }

    #[test]
    fn test_find_by_string() {
        let store = test_store();
        let a = id(0x01);
        let b = id(0x02);
        let c = id(0x03);

        store.put(&a, &Value::Str("likes".into())).unwrap();
        store.put(&b, &Value::Str("likes".into())).unwrap();
        store.put(&c, &Value::Str("other".into())).unwrap();

        let mut found = store.find_by_string("likes").unwrap();
        found.sort();
        assert_eq!(found, vec![a, b]);
        assert!(store.find_by_string("absent").unwrap().is_empty());
    }

    #[test]
    fn test_traversals_preserve_multiplicity() {
        let store = test_store();
        let s = id(0x01);
        let k = id(0x02);
        let t = id(0x03);

        let first = store.add_link(&Link::with_key(s, k, t)).unwrap();
        let second = store.add_link(&Link::with_key(s, k, t)).unwrap();
        assert_ne!(first, second);

        assert_eq!(store.links_from(&s).unwrap().len(), 2);
        assert_eq!(store.links_from_with_key(&s, &k).unwrap().len(), 2);
        assert_eq!(store.links_by_key(&k).unwrap().len(), 2);
        assert_eq!(store.links_to(&t).unwrap().len(), 2);
    }

    #[test]
    fn test_remove_link_removes_one_insertion() {
        let store = test_store();
        let s = id(0x01);
        let t = id(0x02);

        let first = store.add_link(&Link::new(s, t)).unwrap();
        store.add_link(&Link::new(s, t)).unwrap();

        store.remove_link(first).unwrap();

        let remaining = store.links_from(&s).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_ne!(remaining[0].handle, first);
    }

    #[test]
    fn test_unlabeled_links_are_distinct_from_labeled() {
        let store = test_store();
        let s = id(0x01);
        let k = id(0x02);
        let t = id(0x03);

        store.add_link(&Link::new(s, t)).unwrap();
        store.add_link(&Link::with_key(s, k, t)).unwrap();

        assert_eq!(store.links_from(&s).unwrap().len(), 2);
        // Keyed traversal never matches the unlabeled edge
        assert_eq!(store.links_from_with_key(&s, &k).unwrap().len(), 1);
        assert_eq!(store.links_by_key(&k).unwrap().len(), 1);
    }

    #[test]
    fn test_dangling_link_tolerated() {
        // Insert 0x11 -> (key 0x22) -> 0x33 where 0x33 was never stored
        let store = test_store();
        let subject = id(0x11);
        let predicate = id(0x22);
        let object = id(0x33);

        store.put(&subject, &Value::U32(42)).unwrap();
        store.put(&predicate, &Value::Str("likes".into())).unwrap();
        store
            .add_link(&Link::with_key(subject, predicate, object))
            .unwrap();

        let links = store.links_from_with_key(&subject, &predicate).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].link.target, object);

        assert!(matches!(store.get(&object).unwrap_err(), Error::NotFound(_)));
    }

    #[test]
    fn test_stats() {
        let store = test_store();
        store.put(&id(0x01), &Value::Bool(true)).unwrap();
        store.add_link(&Link::new(id(0x01), id(0x02))).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.generation, LATEST_GENERATION);
        assert_eq!(stats.values, 1);
        assert_eq!(stats.links, 1);
    }
}
