use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Graph store error: {0}")]
    Store(#[from] codegraph_store::StoreError),

    #[error("Embedding error: {0}")]
    Embedding(String),
}

impl SearchError {
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }
}
