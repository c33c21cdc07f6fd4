use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from the point store and the graph layer above it
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend is unreachable or refused the connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Collection create/describe failed
    #[error("Collection error: {0}")]
    Collection(String),

    /// Collection or index already exists (swallowed during bootstrap)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Collection or point does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Payload index creation failed
    #[error("Index error: {0}")]
    Index(String),

    #[error("Upsert error: {0}")]
    Upsert(String),

    #[error("Retrieve error: {0}")]
    Retrieve(String),

    #[error("Scroll error: {0}")]
    Scroll(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Delete error: {0}")]
    Delete(String),

    /// Payload could not be decoded into a node or edge
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create a collection error
    pub fn collection(msg: impl Into<String>) -> Self {
        Self::Collection(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an invalid-payload error
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }

    /// True for bootstrap conflicts that repeated initialization may ignore
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    /// True for missing collections/points that teardown may ignore
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
