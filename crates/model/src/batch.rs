use serde::{Deserialize, Serialize};

use crate::{CodeEdge, CodeNode};

/// One extracted file's nodes and edges, ready for upsert
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphBatch {
    pub nodes: Vec<CodeNode>,
    pub edges: Vec<CodeEdge>,
}

impl GraphBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_node(&mut self, node: CodeNode) {
        self.nodes.push(node);
    }

    pub fn push_edge(&mut self, edge: CodeEdge) {
        self.edges.push(edge);
    }

    /// Merge another batch into this one (multi-file accumulation)
    pub fn extend(&mut self, other: Self) {
        self.nodes.extend(other.nodes);
        self.edges.extend(other.edges);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EdgeKind, NodeKind};

    #[test]
    fn test_batch_extend() {
        let mut batch = GraphBatch::new();
        assert!(batch.is_empty());

        batch.push_node(CodeNode::new(NodeKind::File, "a.ts", "a.ts", 1, 1));

        let mut other = GraphBatch::new();
        other.push_node(CodeNode::new(NodeKind::File, "b.ts", "b.ts", 1, 1));
        other.push_edge(CodeEdge::new("x", "y", EdgeKind::Contains));

        batch.extend(other);
        assert_eq!(batch.nodes.len(), 2);
        assert_eq!(batch.edges.len(), 1);
    }
}
