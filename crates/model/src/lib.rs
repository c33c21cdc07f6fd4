//! # Codegraph Model
//!
//! Value types for the code graph: typed nodes, typed directed edges, and
//! the deterministic identifiers that key both into the point store.
//!
//! ## Identity
//!
//! Ids are UUIDv5 strings derived from stable inputs:
//!
//! - node id = f(file path, kind, name, start line)
//! - edge id = f(source id, target id, kind), directional
//!
//! Re-extracting an unchanged file reproduces the same ids, so upserts are
//! idempotent and a changed file overwrites its own points.

mod batch;
mod edge;
mod ids;
mod node;

pub use batch::GraphBatch;
pub use edge::{CodeEdge, EdgeKind};
pub use ids::{edge_id, node_id};
pub use node::{CodeNode, NodeKind};
