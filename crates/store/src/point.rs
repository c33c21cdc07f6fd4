//! Backing point-store interface.
//!
//! The graph layer talks to its store through this trait so the same code
//! runs against Qdrant in production and the in-memory double in tests.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::Result;

/// Parameters for a new collection
#[derive(Debug, Clone)]
pub struct CollectionSpec {
    /// Vector dimensionality
    pub vector_size: usize,

    /// Similarity metric
    pub distance: DistanceKind,

    /// Keep vectors on disk rather than in RAM
    pub on_disk: bool,
}

/// Similarity metric for a collection's vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceKind {
    Cosine,
    Dot,
}

/// Payload field index schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadIndexKind {
    Keyword,
    Integer,
    Float,
}

/// One stored point: id, vector, and a JSON payload
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, serde_json::Value>,
}

/// A point returned from a nearest-neighbor query
#[derive(Debug, Clone)]
pub struct ScoredPointRecord {
    pub point: PointRecord,
    pub score: f32,
}

/// Condition on one payload field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    pub field: String,
    pub predicate: Predicate,
}

impl FieldCondition {
    /// Exact keyword match
    pub fn text(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            predicate: Predicate::Text(value.into()),
        }
    }

    /// Keyword match against any of the given values
    pub fn any_text(field: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            field: field.into(),
            predicate: Predicate::AnyText(values),
        }
    }

    /// Exact integer match
    pub fn integer(field: impl Into<String>, value: i64) -> Self {
        Self {
            field: field.into(),
            predicate: Predicate::Integer(value),
        }
    }

    /// Inclusive integer range
    pub fn range(field: impl Into<String>, gte: Option<i64>, lte: Option<i64>) -> Self {
        Self {
            field: field.into(),
            predicate: Predicate::Range { gte, lte },
        }
    }
}

/// Match predicate for a payload field
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Text(String),
    AnyText(Vec<String>),
    Integer(i64),
    Range { gte: Option<i64>, lte: Option<i64> },
}

/// Conjunction of conditions, with an optional any-of group.
///
/// A point matches when every `must` condition holds and, if `should` is
/// non-empty, at least one `should` condition holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointFilter {
    pub must: Vec<FieldCondition>,
    pub should: Vec<FieldCondition>,
}

impl PointFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a required condition
    #[must_use]
    pub fn must(mut self, condition: FieldCondition) -> Self {
        self.must.push(condition);
        self
    }

    /// Builder: add an any-of condition
    #[must_use]
    pub fn should(mut self, condition: FieldCondition) -> Self {
        self.should.push(condition);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty()
    }
}

/// Vector-capable point store: collections of `{id, vector, payload}` points
/// with payload filtering and nearest-neighbor queries.
#[async_trait]
pub trait PointStore: Send + Sync {
    /// Create a collection. Fails with [`crate::StoreError::AlreadyExists`]
    /// when the collection is already present.
    async fn create_collection(&self, name: &str, spec: &CollectionSpec) -> Result<()>;

    /// Create a payload field index on a collection.
    async fn create_payload_index(
        &self,
        collection: &str,
        field: &str,
        kind: PayloadIndexKind,
    ) -> Result<()>;

    /// Insert or overwrite points keyed by id.
    async fn upsert(&self, collection: &str, points: Vec<PointRecord>) -> Result<()>;

    /// Fetch points by id. Missing ids are omitted; order is not guaranteed.
    async fn retrieve(&self, collection: &str, ids: &[String]) -> Result<Vec<PointRecord>>;

    /// Unordered filtered listing of up to `limit` points.
    async fn scroll(
        &self,
        collection: &str,
        filter: Option<&PointFilter>,
        limit: usize,
    ) -> Result<Vec<PointRecord>>;

    /// Nearest-neighbor query, best score first.
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        filter: Option<&PointFilter>,
        limit: usize,
    ) -> Result<Vec<ScoredPointRecord>>;

    /// Delete points by id. Unknown ids are ignored.
    async fn delete_points(&self, collection: &str, ids: &[String]) -> Result<()>;

    /// Drop a collection. Fails with [`crate::StoreError::NotFound`] when it
    /// does not exist.
    async fn delete_collection(&self, name: &str) -> Result<()>;
}
