//! # Valuegraph - Embedded graph-of-values store
//!
//! Typed scalar facts stored as addressable records, related through
//! directed, optionally-labeled links - a property graph (equivalently,
//! a generalized triple store) persisted in SQLite.
//!
//! Valuegraph provides:
//! - Value records: one typed scalar payload per 16-byte identifier
//! - Link records: directed source-key-target edges with multigraph semantics
//! - Index-backed traversal by source, key, source+key, and target
//! - A generational migration engine that upgrades legacy text-keyed
//!   stores to binary identifiers in place

pub mod id;
pub mod value;
pub mod link;
pub mod storage;
pub mod migration;
pub mod config;

// Re-exports for convenient access
pub use id::RecordId;
pub use value::{Value, ValueKind, ValueRecord};
pub use link::{Link, LinkHandle, StoredLink};
pub use storage::{GraphStore, StoreStats};
pub use migration::{IntegrityReport, LATEST_GENERATION, Migrations};

/// Result type alias for valuegraph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for valuegraph operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Value not found: {0}")]
    NotFound(RecordId),

    #[error("Duplicate identifier: {0}")]
    DuplicateIdentifier(RecordId),

    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    #[error("Migration to generation {target} failed: {source}")]
    MigrationFailed {
        target: i32,
        #[source]
        source: Box<Error>,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
