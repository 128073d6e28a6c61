//! Database schema definitions
//!
//! Two schema generations. Generation 1 keys records by
//! application-assigned text identifiers; generation 2 keys them by
//! 16-byte binary identifiers and adds the string and target indexes.
//! The stored generation lives in SQLite's `user_version` pragma and is
//! only ever advanced by the migration engine.

/// SQL to create the generation-1 values table (text identifiers)
pub const GEN1_CREATE_VALUES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS `values` (
    id   TEXT PRIMARY KEY NOT NULL,
    bool INTEGER,
    u8   INTEGER,
    i8   INTEGER,
    u16  INTEGER,
    i16  INTEGER,
    u32  INTEGER,
    i32  INTEGER,
    u64  INTEGER,
    i64  INTEGER,
    f32  REAL,
    f64  REAL,
    str  TEXT
)
"#;

/// SQL to create the generation-1 links table (text identifiers)
pub const GEN1_CREATE_LINKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS links (
    source_id TEXT NOT NULL,
    key_id    TEXT,
    target_id TEXT NOT NULL
)
"#;

/// SQL to create the generation-1 link traversal indexes
pub const GEN1_CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_links_source ON links(source_id)",
    "CREATE INDEX IF NOT EXISTS idx_links_key ON links(key_id)",
    "CREATE INDEX IF NOT EXISTS idx_links_source_key ON links(source_id, key_id)",
];

/// All generation-1 schema statements, create-if-absent
pub fn gen1_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![GEN1_CREATE_VALUES_TABLE, GEN1_CREATE_LINKS_TABLE];
    stmts.extend(GEN1_CREATE_INDEXES.iter().copied());
    stmts
}

/// SQL to drop the generation-1 indexes ahead of the rewrite
pub const GEN1_DROP_INDEXES: &[&str] = &[
    "DROP INDEX IF EXISTS idx_links_source",
    "DROP INDEX IF EXISTS idx_links_key",
    "DROP INDEX IF EXISTS idx_links_source_key",
];

/// SQL to create the generation-2 values staging table.
///
/// Identifiers are 16-byte BLOBs; the length check is structural, not
/// referential. The table is created under a staging name and swapped
/// in only once the rewrite has fully succeeded.
pub const GEN2_CREATE_VALUES_STAGING: &str = r#"
CREATE TABLE values_next (
    uuid BLOB PRIMARY KEY NOT NULL UNIQUE CHECK (length(uuid) = 16),
    bool INTEGER,
    u8   INTEGER,
    i8   INTEGER,
    u16  INTEGER,
    i16  INTEGER,
    u32  INTEGER,
    i32  INTEGER,
    u64  INTEGER,
    i64  INTEGER,
    f32  REAL,
    f64  REAL,
    str  TEXT
)
"#;

/// SQL to create the generation-2 links staging table.
///
/// Endpoint lengths are checked structurally; endpoints are free to
/// reference identifiers no value record carries (dangling links).
pub const GEN2_CREATE_LINKS_STAGING: &str = r#"
CREATE TABLE links_next (
    source_uuid BLOB NOT NULL CHECK (length(source_uuid) = 16),
    key_uuid    BLOB CHECK (key_uuid IS NULL OR length(key_uuid) = 16),
    target_uuid BLOB NOT NULL CHECK (length(target_uuid) = 16)
)
"#;

/// SQL to swap the staging tables in over the generation-1 tables
pub const GEN2_SWAP_TABLES: &[&str] = &[
    "DROP TABLE `values`",
    "DROP TABLE links",
    "ALTER TABLE values_next RENAME TO `values`",
    "ALTER TABLE links_next RENAME TO links",
];

/// SQL to create the generation-2 indexes
pub const GEN2_CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_values_str ON `values`(str)",
    "CREATE INDEX IF NOT EXISTS idx_links_source ON links(source_uuid)",
    "CREATE INDEX IF NOT EXISTS idx_links_key ON links(key_uuid)",
    "CREATE INDEX IF NOT EXISTS idx_links_source_key ON links(source_uuid, key_uuid)",
    "CREATE INDEX IF NOT EXISTS idx_links_target ON links(target_uuid)",
];
