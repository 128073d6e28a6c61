//! Generational schema migrations
//!
//! A store records its schema generation in SQLite's `user_version`
//! pragma. Each step runs G -> G+1 inside one transaction and advances
//! the recorded generation as its final act, so a failed or interrupted
//! step leaves the store at its prior generation with all prior data
//! intact, and the next startup re-attempts the same step from scratch.
//!
//! - 0 -> 1: create the text-identifier tables and indexes
//!   (create-if-absent; safe to re-run against an initialized store)
//! - 1 -> 2: re-key every record under fresh 16-byte binary
//!   identifiers, rewrite both tables into staging twins, swap them in,
//!   rebuild all indexes, and report link endpoint integrity

use crate::id::RecordId;
use crate::storage::schema;
use crate::{Error, Result};
use rusqlite::{Connection, Transaction, params};
use serde::Serialize;
use std::collections::HashMap;

/// Newest schema generation this crate reads and writes
pub const LATEST_GENERATION: i32 = 2;

/// Read the generation recorded in the store
pub fn stored_generation(conn: &Connection) -> Result<i32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(Into::into)
}

/// Runs outstanding migration steps over a connection.
///
/// Structural rewrites require exclusive access to the store; callers
/// hand the runner the connection before serving any reads or writes.
pub struct Migrations<'c> {
    conn: &'c mut Connection,
    generation: i32,
    reports: Vec<IntegrityReport>,
}

impl<'c> Migrations<'c> {
    pub fn new(conn: &'c mut Connection) -> Result<Self> {
        let generation = stored_generation(conn)?;
        Ok(Self {
            conn,
            generation,
            reports: Vec::new(),
        })
    }

    /// Generation the store currently records
    pub fn generation(&self) -> i32 {
        self.generation
    }

    /// Check whether the store is at the latest generation
    pub fn is_current(&self) -> bool {
        self.generation >= LATEST_GENERATION
    }

    /// Integrity reports produced by the steps run so far
    pub fn integrity_reports(&self) -> &[IntegrityReport] {
        &self.reports
    }

    /// Run the next outstanding step, returning the generation it
    /// reached, or `None` when the store is already current
    pub fn run_step(&mut self) -> Result<Option<i32>> {
        if self.is_current() {
            return Ok(None);
        }

        let target = self.generation + 1;
        tracing::info!(target_generation = target, "running migration step");

        match self.try_step(target) {
            Ok(report) => {
                if let Some(report) = report {
                    if report.malformed_endpoints > 0 {
                        tracing::warn!(
                            malformed = report.malformed_endpoints,
                            "link endpoints with wrong byte length after migration"
                        );
                    }
                    if report.dangling_links > 0 {
                        tracing::info!(
                            dangling = report.dangling_links,
                            "links referencing absent value records (tolerated)"
                        );
                    }
                    self.reports.push(report);
                }
                tracing::info!(generation = target, "migration step complete");
                self.generation = target;
                Ok(Some(target))
            }
            Err(e) => {
                tracing::error!(target_generation = target, error = %e, "migration step failed");
                Err(Error::MigrationFailed {
                    target,
                    source: Box::new(e),
                })
            }
        }
    }

    /// Run every outstanding step, returning the final generation
    pub fn run_to_latest(&mut self) -> Result<i32> {
        while self.run_step()?.is_some() {}
        Ok(self.generation)
    }

    fn try_step(&mut self, target: i32) -> Result<Option<IntegrityReport>> {
        let tx = self.conn.transaction()?;

        let report = if target == 1 {
            init_gen1(&tx)?;
            None
        } else {
            Some(rewrite_to_gen2(&tx)?)
        };

        // Recorded inside the same transaction: the generation only
        // advances if every structural change above committed with it
        tx.pragma_update(None, "user_version", target)?;
        tx.commit()?;

        Ok(report)
    }
}

fn init_gen1(tx: &Transaction) -> Result<()> {
    for stmt in schema::gen1_schema_statements() {
        tx.execute(stmt, [])?;
    }
    Ok(())
}

fn rewrite_to_gen2(tx: &Transaction) -> Result<IntegrityReport> {
    // Consistent re-keying: every distinct text identifier, whether it
    // names a stored value or only appears as a link endpoint, maps to
    // exactly one fresh binary identifier
    let mut ids: HashMap<String, RecordId> = HashMap::new();
    collect_text_ids(tx, &mut ids)?;

    for stmt in schema::GEN1_DROP_INDEXES {
        tx.execute(stmt, [])?;
    }
    tx.execute(schema::GEN2_CREATE_VALUES_STAGING, [])?;
    tx.execute(schema::GEN2_CREATE_LINKS_STAGING, [])?;

    tx.execute(
        "CREATE TEMPORARY TABLE id_map (old TEXT PRIMARY KEY NOT NULL, new BLOB NOT NULL)",
        [],
    )?;
    {
        let mut insert = tx.prepare("INSERT INTO id_map (old, new) VALUES (?1, ?2)")?;
        for (old, new) in &ids {
            insert.execute(params![old, new])?;
        }
    }

    tx.execute(
        r#"
        INSERT INTO values_next (uuid, bool, u8, i8, u16, i16, u32, i32, u64, i64, f32, f64, str)
        SELECT m.new, v.bool, v.u8, v.i8, v.u16, v.i16, v.u32, v.i32, v.u64, v.i64, v.f32, v.f64, v.str
        FROM `values` v
        JOIN id_map m ON m.old = v.id
        "#,
        [],
    )?;

    tx.execute(
        r#"
        INSERT INTO links_next (source_uuid, key_uuid, target_uuid)
        SELECT ms.new, mk.new, mt.new
        FROM links l
        JOIN id_map ms ON ms.old = l.source_id
        LEFT JOIN id_map mk ON mk.old = l.key_id
        JOIN id_map mt ON mt.old = l.target_id
        "#,
        [],
    )?;

    tx.execute("DROP TABLE id_map", [])?;

    for stmt in schema::GEN2_SWAP_TABLES {
        tx.execute(stmt, [])?;
    }
    for stmt in schema::GEN2_CREATE_INDEXES {
        tx.execute(stmt, [])?;
    }

    check_links(tx)
}

fn collect_text_ids(tx: &Transaction, ids: &mut HashMap<String, RecordId>) -> Result<()> {
    let mut stmt = tx.prepare("SELECT id FROM `values`")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        ids.entry(row.get(0)?).or_insert_with(RecordId::random);
    }

    let mut stmt = tx.prepare("SELECT source_id, key_id, target_id FROM links")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        ids.entry(row.get(0)?).or_insert_with(RecordId::random);
        if let Some(key) = row.get::<_, Option<String>>(1)? {
            ids.entry(key).or_insert_with(RecordId::random);
        }
        ids.entry(row.get(2)?).or_insert_with(RecordId::random);
    }

    Ok(())
}

/// Best-effort link endpoint check.
///
/// Counts endpoints of the wrong byte length and links whose endpoints
/// resolve to no value record. Dangling links are tolerated by design;
/// the check reports, it never blocks.
pub fn check_links(conn: &Connection) -> Result<IntegrityReport> {
    let links: i64 = conn.query_row("SELECT COUNT(*) FROM links", [], |row| row.get(0))?;

    let malformed: i64 = conn.query_row(
        r#"
        SELECT COUNT(*) FROM links
        WHERE length(source_uuid) != 16
           OR length(target_uuid) != 16
           OR (key_uuid IS NOT NULL AND length(key_uuid) != 16)
        "#,
        [],
        |row| row.get(0),
    )?;

    let dangling: i64 = conn.query_row(
        r#"
        SELECT COUNT(*) FROM links l
        WHERE NOT EXISTS (SELECT 1 FROM `values` v WHERE v.uuid = l.source_uuid)
           OR NOT EXISTS (SELECT 1 FROM `values` v WHERE v.uuid = l.target_uuid)
           OR (l.key_uuid IS NOT NULL
               AND NOT EXISTS (SELECT 1 FROM `values` v WHERE v.uuid = l.key_uuid))
        "#,
        [],
        |row| row.get(0),
    )?;

    Ok(IntegrityReport {
        links: links as usize,
        malformed_endpoints: malformed as usize,
        dangling_links: dangling as usize,
    })
}

/// Result of the link endpoint check
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    /// Total link records inspected
    pub links: usize,
    /// Endpoints whose stored blob is not 16 bytes
    pub malformed_endpoints: usize,
    /// Links with at least one endpoint resolving to no value record
    pub dangling_links: usize,
}

impl IntegrityReport {
    /// Check whether every endpoint is well-formed
    pub fn is_well_formed(&self) -> bool {
        self.malformed_endpoints == 0
    }
}

impl std::fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Integrity Report:")?;
        writeln!(f, "  Links: {}", self.links)?;
        writeln!(f, "  Malformed endpoints: {}", self.malformed_endpoints)?;
        writeln!(f, "  Dangling links: {}", self.dangling_links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::Link;
    use crate::storage::GraphStore;
    use crate::value::Value;

    #[test]
    fn test_fresh_store_reaches_latest_generation() {
        let store = GraphStore::open_in_memory().unwrap();
        assert_eq!(store.generation().unwrap(), LATEST_GENERATION);
        assert_eq!(store.count_values().unwrap(), 0);
        assert_eq!(store.count_links().unwrap(), 0);
    }

    #[test]
    fn test_run_step_sequence_and_reports() {
        let mut conn = Connection::open_in_memory().unwrap();
        let mut migrations = Migrations::new(&mut conn).unwrap();

        assert_eq!(migrations.generation(), 0);
        assert_eq!(migrations.run_step().unwrap(), Some(1));
        assert_eq!(migrations.run_step().unwrap(), Some(2));
        assert_eq!(migrations.run_step().unwrap(), None);
        assert!(migrations.is_current());

        // The 1 -> 2 rewrite produced one (empty) integrity report
        assert_eq!(migrations.integrity_reports().len(), 1);
        assert_eq!(migrations.integrity_reports()[0].links, 0);
        assert!(migrations.integrity_reports()[0].is_well_formed());
    }

    #[test]
    fn test_gen1_init_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        Migrations::new(&mut conn).unwrap().run_step().unwrap();

        conn.execute("INSERT INTO `values` (id, u32) VALUES ('a', 1)", [])
            .unwrap();

        // Re-running the initialization statements is a no-op
        for stmt in schema::gen1_schema_statements() {
            conn.execute(stmt, []).unwrap();
        }

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM `values`", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(stored_generation(&conn).unwrap(), 1);
    }

    #[test]
    fn test_empty_gen1_store_migrates_to_empty_gen2() {
        let mut conn = Connection::open_in_memory().unwrap();
        Migrations::new(&mut conn).unwrap().run_step().unwrap();
        assert_eq!(stored_generation(&conn).unwrap(), 1);

        let store = GraphStore::from_connection(conn).unwrap();
        assert_eq!(store.generation().unwrap(), LATEST_GENERATION);
        assert_eq!(store.count_values().unwrap(), 0);
        assert_eq!(store.count_links().unwrap(), 0);
    }

    #[test]
    fn test_migrating_gen1_store_rekeys_consistently() {
        let mut conn = Connection::open_in_memory().unwrap();
        Migrations::new(&mut conn).unwrap().run_step().unwrap();

        // Two values, one keyed link to a target that was never stored,
        // and one unlabeled self-link
        conn.execute("INSERT INTO `values` (id, u32) VALUES ('alpha', 7)", [])
            .unwrap();
        conn.execute(
            "INSERT INTO `values` (id, str) VALUES ('pred', 'likes')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO links (source_id, key_id, target_id) VALUES ('alpha', 'pred', 'ghost')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO links (source_id, key_id, target_id) VALUES ('alpha', NULL, 'alpha')",
            [],
        )
        .unwrap();

        let store = GraphStore::from_connection(conn).unwrap();
        assert_eq!(store.generation().unwrap(), LATEST_GENERATION);
        assert_eq!(store.count_values().unwrap(), 2);
        assert_eq!(store.count_links().unwrap(), 2);

        // The predicate record is findable by its string payload
        let keys = store.find_by_string("likes").unwrap();
        assert_eq!(keys.len(), 1);
        let pred = keys[0];

        // The keyed link survived and its source maps to the u32 record
        let labeled = store.links_by_key(&pred).unwrap();
        assert_eq!(labeled.len(), 1);
        let alpha = labeled[0].link.source;
        assert_eq!(store.get(&alpha).unwrap().payload, Some(Value::U32(7)));

        // 'ghost' got its own consistent identifier but stays dangling
        let ghost = labeled[0].link.target;
        assert!(matches!(
            store.get(&ghost).unwrap_err(),
            crate::Error::NotFound(_)
        ));

        // The self-link kept source == target under the new identifier
        let unlabeled: Vec<_> = store
            .links_from(&alpha)
            .unwrap()
            .into_iter()
            .filter(|l| l.link.key.is_none())
            .collect();
        assert_eq!(unlabeled.len(), 1);
        assert_eq!(unlabeled[0].link.source, alpha);
        assert_eq!(unlabeled[0].link.target, alpha);

        let report = store.check_integrity().unwrap();
        assert_eq!(report.links, 2);
        assert!(report.is_well_formed());
        assert_eq!(report.dangling_links, 1);
    }

    #[test]
    fn test_reopen_preserves_data_and_generation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        let id = RecordId::random();

        {
            let store = GraphStore::open(&path).unwrap();
            store.put(&id, &Value::I64(-3)).unwrap();
            store.add_link(&Link::new(id, RecordId::random())).unwrap();
        }

        let store = GraphStore::open(&path).unwrap();
        assert_eq!(store.generation().unwrap(), LATEST_GENERATION);
        assert_eq!(store.get(&id).unwrap().payload, Some(Value::I64(-3)));
        assert_eq!(store.count_links().unwrap(), 1);
    }

    #[test]
    fn test_check_links_counts_dangling() {
        let store = GraphStore::open_in_memory().unwrap();
        let a = RecordId::random();
        let b = RecordId::random();

        store.put(&a, &Value::Bool(true)).unwrap();
        store.add_link(&Link::new(a, b)).unwrap();

        let report = store.check_integrity().unwrap();
        assert_eq!(report.links, 1);
        assert_eq!(report.malformed_endpoints, 0);
        assert_eq!(report.dangling_links, 1);
    }
}
