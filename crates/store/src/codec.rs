//! Payload codec between graph values and stored points.
//!
//! Nodes carry their embedding as the point vector (all zeros when no
//! embedding has been computed, so the collection schema is always
//! satisfied). Edges carry `weight` as a one-dimensional vector; the real
//! edge data lives entirely in the payload.

use std::collections::HashMap;

use codegraph_model::{CodeEdge, CodeNode, EdgeKind, NodeKind};
use serde_json::{json, Value};

use crate::{PointRecord, Result, StoreError};

pub(crate) fn node_to_point(node: &CodeNode, vector_size: usize) -> PointRecord {
    let vector = node
        .embedding
        .clone()
        .unwrap_or_else(|| vec![0.0; vector_size]);
    let mut payload = HashMap::new();
    payload.insert("kind".to_string(), json!(node.kind.as_str()));
    payload.insert("name".to_string(), json!(node.name));
    payload.insert("file_path".to_string(), json!(node.file_path));
    payload.insert("start_line".to_string(), json!(node.start_line));
    payload.insert("end_line".to_string(), json!(node.end_line));
    payload.insert("content".to_string(), json!(node.content));
    payload.insert(
        "metadata".to_string(),
        Value::Object(node.metadata.clone().into_iter().collect()),
    );
    PointRecord {
        id: node.id.clone(),
        vector,
        payload,
    }
}

pub(crate) fn point_to_node(point: PointRecord) -> Result<CodeNode> {
    let kind_str = payload_str(&point.payload, "kind")?;
    let kind = NodeKind::parse(kind_str)
        .ok_or_else(|| StoreError::invalid_payload(format!("unknown node kind `{kind_str}`")))?;
    let node = CodeNode {
        kind,
        name: payload_str(&point.payload, "name")?.to_string(),
        file_path: payload_str(&point.payload, "file_path")?.to_string(),
        start_line: payload_line(&point.payload, "start_line")?,
        end_line: payload_line(&point.payload, "end_line")?,
        content: payload_str(&point.payload, "content")
            .unwrap_or_default()
            .to_string(),
        metadata: payload_metadata(&point.payload),
        embedding: if point.vector.is_empty() {
            None
        } else {
            Some(point.vector)
        },
        id: point.id,
    };
    Ok(node)
}

pub(crate) fn edge_to_point(edge: &CodeEdge) -> PointRecord {
    let mut payload = HashMap::new();
    payload.insert("source".to_string(), json!(edge.source));
    payload.insert("target".to_string(), json!(edge.target));
    payload.insert("kind".to_string(), json!(edge.kind.as_str()));
    payload.insert("weight".to_string(), json!(edge.weight));
    payload.insert(
        "metadata".to_string(),
        Value::Object(edge.metadata.clone().into_iter().collect()),
    );
    PointRecord {
        id: edge.id.clone(),
        vector: vec![edge.weight],
        payload,
    }
}

pub(crate) fn point_to_edge(point: PointRecord) -> Result<CodeEdge> {
    let kind_str = payload_str(&point.payload, "kind")?;
    let kind = EdgeKind::parse(kind_str)
        .ok_or_else(|| StoreError::invalid_payload(format!("unknown edge kind `{kind_str}`")))?;
    let edge = CodeEdge {
        kind,
        source: payload_str(&point.payload, "source")?.to_string(),
        target: payload_str(&point.payload, "target")?.to_string(),
        weight: point
            .payload
            .get("weight")
            .and_then(Value::as_f64)
            .map_or(1.0, |w| w as f32),
        metadata: payload_metadata(&point.payload),
        id: point.id,
    };
    Ok(edge)
}

fn payload_str<'a>(payload: &'a HashMap<String, Value>, key: &str) -> Result<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::invalid_payload(format!("missing `{key}`")))
}

fn payload_line(payload: &HashMap<String, Value>, key: &str) -> Result<usize> {
    payload
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| StoreError::invalid_payload(format!("missing numeric `{key}`")))
}

fn payload_metadata(payload: &HashMap<String, Value>) -> HashMap<String, Value> {
    payload
        .get("metadata")
        .and_then(Value::as_object)
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_node_round_trip() {
        let node = CodeNode::new(NodeKind::Method, "run", "src/app.ts", 5, 9)
            .content("run() {}")
            .meta("is_async", json!(true));

        let point = node_to_point(&node, 4);
        assert_eq!(point.vector, vec![0.0; 4]);

        let back = point_to_node(point).expect("decode node");
        assert_eq!(back.id, node.id);
        assert_eq!(back.kind, node.kind);
        assert_eq!(back.name, node.name);
        assert_eq!(back.file_path, node.file_path);
        assert_eq!(back.start_line, node.start_line);
        assert_eq!(back.end_line, node.end_line);
        assert_eq!(back.content, node.content);
        assert_eq!(back.metadata, node.metadata);
        assert_eq!(back.embedding, Some(vec![0.0; 4]));
    }

    #[test]
    fn test_node_keeps_existing_embedding() {
        let node =
            CodeNode::new(NodeKind::Function, "f", "a.ts", 1, 2).embedding(vec![0.5, -0.5]);
        let point = node_to_point(&node, 2);
        assert_eq!(point.vector, vec![0.5, -0.5]);
    }

    #[test]
    fn test_edge_round_trip() {
        let edge = CodeEdge::new("a", "RawName", EdgeKind::Extends)
            .weight(0.5)
            .unresolved();

        let point = edge_to_point(&edge);
        assert_eq!(point.vector, vec![0.5]);

        let back = point_to_edge(point).expect("decode edge");
        assert_eq!(back, edge);
        assert!(back.is_unresolved());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let node = CodeNode::new(NodeKind::Class, "C", "a.ts", 1, 2);
        let mut point = node_to_point(&node, 1);
        point
            .payload
            .insert("kind".to_string(), json!("blueprint"));
        assert!(point_to_node(point).is_err());
    }

    #[test]
    fn test_missing_field_rejected() {
        let edge = CodeEdge::new("a", "b", EdgeKind::Calls);
        let mut point = edge_to_point(&edge);
        point.payload.remove("target");
        assert!(point_to_edge(point).is_err());
    }
}
