//! Context-aware semantic search over the code graph.

mod context;
mod embedder;
mod error;
mod similarity;

pub use context::{ContextSearch, ContextualResult, NodeContext, SearchOptions};
pub use embedder::{Embedder, HashingEmbedder};
pub use error::{Result, SearchError};
pub use similarity::cosine_score;
