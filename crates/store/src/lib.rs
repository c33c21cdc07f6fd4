//! Graph storage for code relationships.
//!
//! Persists code nodes and edges as points in a vector database, one pair of
//! collections per workspace, and layers graph queries on top: neighborhood
//! traversal, induced subgraphs, location lookup, and nearest-neighbor
//! search over node embeddings.
//!
//! # Features
//!
//! - **Pluggable backend**: [`PointStore`] abstracts the vector database;
//!   [`QdrantBackend`] talks to a Qdrant instance while
//!   [`InMemoryPointStore`] backs tests and small tools.
//! - **Deterministic layout**: collection names derive from the workspace
//!   root, so re-indexing the same workspace reuses its collections.
//! - **Two-phase linking**: [`ReferenceLinker`] resolves raw-name heritage
//!   targets once the whole workspace has been ingested.
//!
//! # Architecture
//!
//! ```text
//! GraphStore ──┬── nodes collection (embedding vector + payload)
//!              └── edges collection (weight vector + payload)
//!                        │
//!                  PointStore trait
//!                  ┌─────┴──────┐
//!            QdrantBackend   InMemoryPointStore
//! ```

mod codec;
mod config;
mod error;
mod graph;
mod linker;
mod memory;
mod point;
mod qdrant;

pub use config::GraphStoreConfig;
pub use error::{Result, StoreError};
pub use graph::{GraphStore, Subgraph};
pub use linker::{LinkReport, ReferenceLinker};
pub use memory::InMemoryPointStore;
pub use point::{
    CollectionSpec, DistanceKind, FieldCondition, PayloadIndexKind, PointFilter, PointRecord,
    PointStore, Predicate, ScoredPointRecord,
};
pub use qdrant::QdrantBackend;
