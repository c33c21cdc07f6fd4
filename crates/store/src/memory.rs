//! In-memory [`PointStore`] used by tests and local experimentation.
//!
//! Mirrors the backend contract closely enough that graph-layer behavior
//! (filters, degraded reads, bootstrap conflicts) can be exercised without
//! a running Qdrant instance.

use std::collections::HashMap;

use tokio::sync::RwLock;

use async_trait::async_trait;

use crate::{
    CollectionSpec, DistanceKind, FieldCondition, PayloadIndexKind, PointFilter, PointRecord,
    PointStore, Predicate, Result, ScoredPointRecord, StoreError,
};

struct MemoryCollection {
    vector_size: usize,
    distance: DistanceKind,
    points: HashMap<String, PointRecord>,
}

/// Process-local point store keyed by collection name
#[derive(Default)]
pub struct InMemoryPointStore {
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

impl InMemoryPointStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_condition(point: &PointRecord, condition: &FieldCondition) -> bool {
    let value = point.payload.get(&condition.field);
    match &condition.predicate {
        Predicate::Text(expected) => {
            value.and_then(serde_json::Value::as_str) == Some(expected.as_str())
        }
        Predicate::AnyText(values) => value
            .and_then(serde_json::Value::as_str)
            .is_some_and(|s| values.iter().any(|v| v == s)),
        Predicate::Integer(expected) => {
            value.and_then(serde_json::Value::as_i64) == Some(*expected)
        }
        Predicate::Range { gte, lte } => {
            let Some(v) = value.and_then(serde_json::Value::as_i64) else {
                return false;
            };
            gte.is_none_or(|bound| v >= bound) && lte.is_none_or(|bound| v <= bound)
        }
    }
}

fn matches_filter(point: &PointRecord, filter: &PointFilter) -> bool {
    filter.must.iter().all(|c| matches_condition(point, c))
        && (filter.should.is_empty() || filter.should.iter().any(|c| matches_condition(point, c)))
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[async_trait]
impl PointStore for InMemoryPointStore {
    async fn create_collection(&self, name: &str, spec: &CollectionSpec) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        collections.insert(
            name.to_string(),
            MemoryCollection {
                vector_size: spec.vector_size,
                distance: spec.distance,
                points: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn create_payload_index(
        &self,
        collection: &str,
        _field: &str,
        _kind: PayloadIndexKind,
    ) -> Result<()> {
        // Every field is filterable here; only validate the collection.
        let collections = self.collections.read().await;
        if collections.contains_key(collection) {
            Ok(())
        } else {
            Err(StoreError::not_found(collection))
        }
    }

    async fn upsert(&self, collection: &str, points: Vec<PointRecord>) -> Result<()> {
        let mut collections = self.collections.write().await;
        let col = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection))?;
        for point in points {
            if point.vector.len() != col.vector_size {
                return Err(StoreError::Upsert(format!(
                    "vector size {} does not match collection size {}",
                    point.vector.len(),
                    col.vector_size
                )));
            }
            col.points.insert(point.id.clone(), point);
        }
        Ok(())
    }

    async fn retrieve(&self, collection: &str, ids: &[String]) -> Result<Vec<PointRecord>> {
        let collections = self.collections.read().await;
        let col = collections
            .get(collection)
            .ok_or_else(|| StoreError::not_found(collection))?;
        Ok(ids.iter().filter_map(|id| col.points.get(id).cloned()).collect())
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: Option<&PointFilter>,
        limit: usize,
    ) -> Result<Vec<PointRecord>> {
        let collections = self.collections.read().await;
        let col = collections
            .get(collection)
            .ok_or_else(|| StoreError::not_found(collection))?;
        Ok(col
            .points
            .values()
            .filter(|p| filter.is_none_or(|f| matches_filter(p, f)))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        filter: Option<&PointFilter>,
        limit: usize,
    ) -> Result<Vec<ScoredPointRecord>> {
        let collections = self.collections.read().await;
        let col = collections
            .get(collection)
            .ok_or_else(|| StoreError::not_found(collection))?;
        let mut scored: Vec<ScoredPointRecord> = col
            .points
            .values()
            .filter(|p| filter.is_none_or(|f| matches_filter(p, f)))
            .map(|p| ScoredPointRecord {
                score: match col.distance {
                    DistanceKind::Cosine => cosine_similarity(vector, &p.vector),
                    DistanceKind::Dot => dot_product(vector, &p.vector),
                },
                point: p.clone(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn delete_points(&self, collection: &str, ids: &[String]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let col = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection))?;
        for id in ids {
            col.points.remove(id);
        }
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.remove(name).is_none() {
            return Err(StoreError::not_found(name));
        }
        Ok(())
    }
}
