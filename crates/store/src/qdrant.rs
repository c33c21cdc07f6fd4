//! Qdrant-backed implementation of [`PointStore`].
//!
//! Translation layer between the store's neutral point model and the Qdrant
//! gRPC API: filters become Qdrant conditions, payloads round-trip through
//! JSON, and scrolls paginate until the requested limit is reached.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, DeletePointsBuilder,
    Distance, FieldType, Filter, GetPointsBuilder, PointId, PointStruct, PointsIdsList, Range,
    RetrievedPoint, ScoredPoint, ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder, VectorsOutput, point_id::PointIdOptions, value::Kind,
    vectors_output::VectorsOptions,
};

use crate::{
    CollectionSpec, DistanceKind, FieldCondition, PayloadIndexKind, PointFilter, PointRecord,
    PointStore, Predicate, Result, ScoredPointRecord, StoreError,
};

/// Points fetched per scroll request
const SCROLL_PAGE: usize = 256;

/// Qdrant-backed point store; one client shared across collections
pub struct QdrantBackend {
    client: Qdrant,
}

impl std::fmt::Debug for QdrantBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantBackend").finish_non_exhaustive()
    }
}

impl QdrantBackend {
    /// Connect to a Qdrant instance at `url` (gRPC port, e.g.
    /// `http://localhost:6334`).
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be constructed.
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PointStore for QdrantBackend {
    async fn create_collection(&self, name: &str, spec: &CollectionSpec) -> Result<()> {
        let exists = self
            .client
            .collection_exists(name)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        if exists {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        let distance = match spec.distance {
            DistanceKind::Cosine => Distance::Cosine,
            DistanceKind::Dot => Distance::Dot,
        };
        let vectors =
            VectorParamsBuilder::new(spec.vector_size as u64, distance).on_disk(spec.on_disk);
        self.client
            .create_collection(CreateCollectionBuilder::new(name).vectors_config(vectors))
            .await
            .map_err(|e| classify(e, StoreError::Collection))?;
        Ok(())
    }

    async fn create_payload_index(
        &self,
        collection: &str,
        field: &str,
        kind: PayloadIndexKind,
    ) -> Result<()> {
        let field_type = match kind {
            PayloadIndexKind::Keyword => FieldType::Keyword,
            PayloadIndexKind::Integer => FieldType::Integer,
            PayloadIndexKind::Float => FieldType::Float,
        };
        self.client
            .create_field_index(CreateFieldIndexCollectionBuilder::new(
                collection, field, field_type,
            ))
            .await
            .map_err(|e| classify(e, StoreError::Index))?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<PointRecord>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let qdrant_points: Vec<PointStruct> = points
            .into_iter()
            .map(|p| {
                let payload = json_to_payload(p.payload)?;
                Ok(PointStruct::new(p.id, p.vector, payload))
            })
            .collect::<Result<_>>()?;
        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, qdrant_points))
            .await
            .map_err(|e| StoreError::Upsert(e.to_string()))?;
        Ok(())
    }

    async fn retrieve(&self, collection: &str, ids: &[String]) -> Result<Vec<PointRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let point_ids: Vec<PointId> = ids.iter().cloned().map(PointId::from).collect();
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(collection, point_ids)
                    .with_payload(true)
                    .with_vectors(true),
            )
            .await
            .map_err(|e| StoreError::Retrieve(e.to_string()))?;
        Ok(response.result.into_iter().map(retrieved_to_record).collect())
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: Option<&PointFilter>,
        limit: usize,
    ) -> Result<Vec<PointRecord>> {
        let qdrant_filter = filter.map(filter_to_qdrant);
        let mut records = Vec::new();
        let mut offset: Option<PointId> = None;

        while records.len() < limit {
            let page = (limit - records.len()).min(SCROLL_PAGE);
            let mut builder = ScrollPointsBuilder::new(collection)
                .with_payload(true)
                .with_vectors(true)
                .limit(page as u32);
            if let Some(ref f) = qdrant_filter {
                builder = builder.filter(f.clone());
            }
            if let Some(ref off) = offset {
                builder = builder.offset(off.clone());
            }

            let response = self
                .client
                .scroll(builder)
                .await
                .map_err(|e| StoreError::Scroll(e.to_string()))?;
            records.extend(response.result.into_iter().map(retrieved_to_record));

            match response.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(records)
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        filter: Option<&PointFilter>,
        limit: usize,
    ) -> Result<Vec<ScoredPointRecord>> {
        let mut builder = SearchPointsBuilder::new(collection, vector.to_vec(), limit as u64)
            .with_payload(true)
            .with_vectors(true);
        if let Some(f) = filter {
            builder = builder.filter(filter_to_qdrant(f));
        }
        let response = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(response.result.into_iter().map(scored_to_record).collect())
    }

    async fn delete_points(&self, collection: &str, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let ids: Vec<PointId> = ids.iter().cloned().map(PointId::from).collect();
        self.client
            .delete_points(DeletePointsBuilder::new(collection).points(PointsIdsList { ids }))
            .await
            .map_err(|e| StoreError::Delete(e.to_string()))?;
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .delete_collection(name)
            .await
            .map_err(|e| classify(e, StoreError::Delete))?;
        if response.result {
            Ok(())
        } else {
            Err(StoreError::not_found(name))
        }
    }
}

/// Map backend errors onto conflict/missing variants when the message makes
/// the cause unambiguous.
fn classify(error: qdrant_client::QdrantError, fallback: fn(String) -> StoreError) -> StoreError {
    let message = error.to_string();
    let lower = message.to_lowercase();
    if lower.contains("already exists") {
        StoreError::AlreadyExists(message)
    } else if lower.contains("not found") || lower.contains("doesn't exist") {
        StoreError::NotFound(message)
    } else {
        fallback(message)
    }
}

fn filter_to_qdrant(filter: &PointFilter) -> Filter {
    let mut must: Vec<Condition> = filter.must.iter().map(condition_to_qdrant).collect();
    if !filter.should.is_empty() {
        // Qdrant treats top-level should clauses as optional once a must is
        // present; nesting them as one condition keeps them mandatory.
        let group = Filter {
            should: filter.should.iter().map(condition_to_qdrant).collect(),
            ..Filter::default()
        };
        must.push(Condition::from(group));
    }
    Filter {
        must,
        ..Filter::default()
    }
}

fn condition_to_qdrant(condition: &FieldCondition) -> Condition {
    let field = condition.field.clone();
    match &condition.predicate {
        Predicate::Text(value) => Condition::matches(field, value.clone()),
        Predicate::AnyText(values) => Condition::matches(field, values.clone()),
        Predicate::Integer(value) => Condition::matches(field, *value),
        Predicate::Range { gte, lte } => Condition::range(
            field,
            Range {
                gte: gte.map(|v| v as f64),
                lte: lte.map(|v| v as f64),
                ..Range::default()
            },
        ),
    }
}

fn retrieved_to_record(point: RetrievedPoint) -> PointRecord {
    PointRecord {
        id: point_id_string(point.id),
        vector: vector_data(point.vectors),
        payload: payload_to_json(point.payload),
    }
}

fn scored_to_record(point: ScoredPoint) -> ScoredPointRecord {
    ScoredPointRecord {
        point: PointRecord {
            id: point_id_string(point.id),
            vector: vector_data(point.vectors),
            payload: payload_to_json(point.payload),
        },
        score: point.score,
    }
}

fn point_id_string(id: Option<PointId>) -> String {
    match id.and_then(|pid| pid.point_id_options) {
        Some(PointIdOptions::Uuid(u)) => u,
        Some(PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

fn vector_data(vectors: Option<VectorsOutput>) -> Vec<f32> {
    match vectors.and_then(|v| v.vectors_options) {
        Some(VectorsOptions::Vector(v)) => v.data,
        _ => Vec::new(),
    }
}

fn json_to_payload(
    payload: HashMap<String, serde_json::Value>,
) -> Result<HashMap<String, qdrant_client::qdrant::Value>> {
    let object = serde_json::Value::Object(payload.into_iter().collect());
    Ok(serde_json::from_value(object)?)
}

/// Recursive counterpart of [`json_to_payload`]: structs and lists come back
/// intact, so nested metadata survives the round trip.
fn payload_to_json(
    payload: HashMap<String, qdrant_client::qdrant::Value>,
) -> HashMap<String, serde_json::Value> {
    payload
        .into_iter()
        .filter_map(|(k, v)| Some((k, qdrant_value_to_json(v)?)))
        .collect()
}

fn qdrant_value_to_json(value: qdrant_client::qdrant::Value) -> Option<serde_json::Value> {
    Some(match value.kind? {
        Kind::NullValue(_) => serde_json::Value::Null,
        Kind::BoolValue(b) => serde_json::Value::Bool(b),
        Kind::IntegerValue(i) => serde_json::Value::Number(i.into()),
        Kind::DoubleValue(d) => serde_json::Number::from_f64(d).map(serde_json::Value::Number)?,
        Kind::StringValue(s) => serde_json::Value::String(s),
        Kind::StructValue(s) => serde_json::Value::Object(
            s.fields
                .into_iter()
                .filter_map(|(k, v)| Some((k, qdrant_value_to_json(v)?)))
                .collect(),
        ),
        Kind::ListValue(l) => {
            serde_json::Value::Array(l.values.into_iter().filter_map(qdrant_value_to_json).collect())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_new_invalid_url() {
        let backend = QdrantBackend::new("not a valid url");
        assert!(backend.is_err());
    }

    #[test]
    fn test_debug_format_hides_client() {
        let backend = QdrantBackend::new("http://localhost:6334").unwrap();
        let output = format!("{backend:?}");
        assert!(output.contains("QdrantBackend"));
    }

    #[test]
    fn test_classify_conflict_and_missing() {
        let conflict = classify(
            qdrant_client::QdrantError::ConversionError("Collection `x` already exists".into()),
            StoreError::Collection,
        );
        assert!(conflict.is_already_exists());

        let missing = classify(
            qdrant_client::QdrantError::ConversionError("Collection `x` doesn't exist".into()),
            StoreError::Delete,
        );
        assert!(missing.is_not_found());

        let other = classify(
            qdrant_client::QdrantError::ConversionError("timeout".into()),
            StoreError::Delete,
        );
        assert!(matches!(other, StoreError::Delete(_)));
    }

    #[test]
    fn test_should_group_nested_under_must() {
        let filter = PointFilter::new()
            .must(FieldCondition::text("kind", "class"))
            .should(FieldCondition::text("source", "a"))
            .should(FieldCondition::text("target", "a"));
        let translated = filter_to_qdrant(&filter);
        assert_eq!(translated.must.len(), 2);
        assert!(translated.should.is_empty());
    }

    #[test]
    fn test_payload_round_trip_preserves_nesting() {
        let mut payload = HashMap::new();
        payload.insert("name".to_string(), json!("handler"));
        payload.insert("start_line".to_string(), json!(42));
        payload.insert(
            "metadata".to_string(),
            json!({"is_async": true, "decorators": ["staticmethod"]}),
        );

        let qdrant = json_to_payload(payload.clone()).unwrap();
        let back = payload_to_json(qdrant);
        assert_eq!(back, payload);
    }

    #[test]
    fn test_point_id_string_variants() {
        assert_eq!(point_id_string(Some(PointId::from("abc".to_string()))), "abc");
        assert_eq!(point_id_string(Some(PointId::from(7_u64))), "7");
        assert_eq!(point_id_string(None), "");
    }
}
