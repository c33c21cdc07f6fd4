use serde::{Deserialize, Serialize};

/// Configuration for one workspace's graph store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStoreConfig {
    /// Workspace root path; collection names are derived from its hash
    pub workspace_root: String,

    /// Embedding dimensionality of the nodes collection
    pub vector_size: usize,

    /// Keep vectors on disk rather than fully in RAM
    pub on_disk: bool,
}

impl Default for GraphStoreConfig {
    fn default() -> Self {
        Self {
            workspace_root: ".".to_string(),
            vector_size: 384,
            on_disk: true,
        }
    }
}

impl GraphStoreConfig {
    /// Create a configuration for a workspace with default sizing
    #[must_use]
    pub fn new(workspace_root: impl Into<String>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            ..Default::default()
        }
    }

    /// Builder: set embedding dimensionality
    #[must_use]
    pub const fn vector_size(mut self, vector_size: usize) -> Self {
        self.vector_size = vector_size;
        self
    }

    /// Builder: keep vectors in RAM (useful for small test workspaces)
    #[must_use]
    pub const fn in_memory_vectors(mut self) -> Self {
        self.on_disk = false;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.workspace_root.is_empty() {
            return Err("workspace_root must not be empty".to_string());
        }
        if self.vector_size == 0 {
            return Err("vector_size must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(GraphStoreConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_vector_size() {
        let config = GraphStoreConfig::new("/ws").vector_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_root() {
        let config = GraphStoreConfig::new("");
        assert!(config.validate().is_err());
    }
}
