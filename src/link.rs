//! Link records - directed, optionally-labeled edges
//!
//! A link relates two identifiers, optionally through a third acting as
//! the edge's key (predicate). Links form a multigraph: identical
//! tuples may coexist, each insertion independently removable through
//! its handle. Endpoints are never required to resolve to stored value
//! records, so readers must tolerate dangling links.

use crate::id::RecordId;
use serde::{Deserialize, Serialize};

/// A directed edge between two identifiers, with an optional key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    /// Identifier the edge originates from
    pub source: RecordId,
    /// Optional identifier labeling the edge (its predicate)
    pub key: Option<RecordId>,
    /// Identifier the edge points to
    pub target: RecordId,
}

impl Link {
    /// Create an unlabeled edge
    pub fn new(source: RecordId, target: RecordId) -> Self {
        Self {
            source,
            key: None,
            target,
        }
    }

    /// Create a labeled edge (a source-key-target triple)
    pub fn with_key(source: RecordId, key: RecordId, target: RecordId) -> Self {
        Self {
            source,
            key: Some(key),
            target,
        }
    }

    /// Check if this edge carries a key
    pub fn is_labeled(&self) -> bool {
        self.key.is_some()
    }
}

/// Handle to one stored link insertion.
///
/// Identical links may be inserted repeatedly; the handle names one
/// insertion so it can be removed without touching its duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkHandle(pub(crate) i64);

impl LinkHandle {
    /// Raw row identifier backing the handle
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for LinkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A link as returned by traversal queries, carrying its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredLink {
    /// Handle of this insertion
    pub handle: LinkHandle,
    /// The edge itself
    pub link: Link,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlabeled_link() {
        let link = Link::new(RecordId::from_bytes([1; 16]), RecordId::from_bytes([2; 16]));
        assert!(!link.is_labeled());
        assert_eq!(link.key, None);
    }

    #[test]
    fn test_labeled_link() {
        let link = Link::with_key(
            RecordId::from_bytes([1; 16]),
            RecordId::from_bytes([2; 16]),
            RecordId::from_bytes([3; 16]),
        );
        assert!(link.is_labeled());
        assert_eq!(link.key, Some(RecordId::from_bytes([2; 16])));
    }
}
