//! Deterministic point ids.
//!
//! The backing store only accepts unsigned integers or UUID strings as
//! point ids, so ids are UUIDv5 over a fixed namespace. The key material
//! includes every identifying field, which makes re-extraction idempotent.

use uuid::Uuid;

use crate::{EdgeKind, NodeKind};

const GRAPH_NAMESPACE: Uuid = Uuid::from_bytes([
    0x63, 0x6f, 0x64, 0x65, // "code"
    0x67, 0x72, 0x61, 0x70, // "grap"
    0x68, 0x00, 0x00, 0x00, // "h"
    0x00, 0x00, 0x00, 0x01, // version
]);

/// Id for a node extracted at a specific location
#[must_use]
pub fn node_id(file_path: &str, kind: NodeKind, name: &str, start_line: usize) -> String {
    let key = format!("node:{file_path}:{}:{name}:{start_line}", kind.as_str());
    Uuid::new_v5(&GRAPH_NAMESPACE, key.as_bytes()).to_string()
}

/// Id for a directed edge; swapping source and target changes the id
#[must_use]
pub fn edge_id(source: &str, target: &str, kind: EdgeKind) -> String {
    let key = format!("edge:{source}->{target}:{}", kind.as_str());
    Uuid::new_v5(&GRAPH_NAMESPACE, key.as_bytes()).to_string()
}
