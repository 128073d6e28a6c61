//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - `values`(uuid, bool, u8, i8, u16, i16, u32, i32, u64, i64, f32, f64, str)
//! - links(source_uuid, key_uuid, target_uuid)
//!
//! plus the four link traversal indexes and the string index over
//! values. The schema generation is recorded in the `user_version`
//! pragma and maintained by the migration engine.

pub mod schema;
pub mod sqlite;

pub use sqlite::{GraphStore, StoreStats};
