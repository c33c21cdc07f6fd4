use std::cmp::Reverse;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use codegraph_model::{CodeEdge, CodeNode, EdgeKind, NodeKind};
use codegraph_store::GraphStore;

use crate::embedder::Embedder;
use crate::error::{Result, SearchError};
use crate::similarity::cosine_score;

/// Candidates fetched per requested result before local rescoring
const OVERFETCH_FACTOR: usize = 2;
/// Related nodes kept per context bundle
const RELATED_LIMIT: usize = 10;
/// Relationships kept per context bundle
const RELATIONSHIP_LIMIT: usize = 20;
/// Hop budget for location and relation lookups
const EXPLORE_DEPTH: usize = 3;
/// Upper bound on nodes expanded by the caller and dependency walks
const WALK_LIMIT: usize = 256;

/// Knobs for [`ContextSearch::search_with_context`].
///
/// The first entry of `node_kinds` narrows the candidate search; the first
/// entry of `edge_kinds` steers the context walk.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    pub node_kinds: Vec<NodeKind>,
    pub edge_kinds: Vec<EdgeKind>,
    pub include_related: bool,
    pub max_depth: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            node_kinds: Vec::new(),
            edge_kinds: Vec::new(),
            include_related: true,
            max_depth: 2,
        }
    }
}

impl SearchOptions {
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn node_kind(mut self, kind: NodeKind) -> Self {
        self.node_kinds.push(kind);
        self
    }

    #[must_use]
    pub fn edge_kind(mut self, kind: EdgeKind) -> Self {
        self.edge_kinds.push(kind);
        self
    }

    #[must_use]
    pub fn without_related(mut self) -> Self {
        self.include_related = false;
        self
    }

    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// One ranked match plus its automatically gathered surroundings
#[derive(Debug, Clone)]
pub struct ContextualResult {
    pub node: CodeNode,
    pub score: f32,
    pub context: Option<NodeContext>,
}

/// Graph neighborhood assembled around a single node
#[derive(Debug, Clone, Default)]
pub struct NodeContext {
    /// Nodes reachable within the configured depth
    pub related_nodes: Vec<CodeNode>,
    /// Edges touching the node itself
    pub relationships: Vec<CodeEdge>,
    /// Transitive callers, nearest first; callables only
    pub call_chain: Vec<CodeNode>,
    /// Transitive closure over import-style edges
    pub dependencies: Vec<CodeNode>,
}

/// Context-aware semantic search over an indexed code graph.
///
/// Every answer bundles the matched node with the related code an agent
/// would otherwise have to chase down by hand.
pub struct ContextSearch {
    store: GraphStore,
    embedder: Arc<dyn Embedder>,
}

impl ContextSearch {
    pub fn new(store: GraphStore, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// The graph store this service reads from.
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Embed `query`, rank stored nodes against it and assemble context
    /// for the best matches.
    ///
    /// Scores are the query/node cosine mapped onto `[0, 1]`; nodes
    /// without a usable embedding score 0.0. A blank query yields no
    /// results rather than an error.
    pub async fn search_with_context(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<ContextualResult>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self
            .embedder
            .create_embeddings(&[query.to_string()])
            .await?;
        let Some(query_vector) = embeddings.into_iter().next() else {
            return Err(SearchError::embedding("no vector produced for query"));
        };

        let kind_filter = options.node_kinds.first().copied();
        let candidates = self
            .store
            .search_similar_nodes(
                &query_vector,
                options.limit * OVERFETCH_FACTOR,
                kind_filter,
            )
            .await;

        let walk_kind = options.edge_kinds.first().copied();
        let mut seen = HashSet::new();
        let mut results = Vec::new();
        for node in candidates {
            if !seen.insert(node.id.clone()) {
                continue;
            }
            let score = node
                .embedding
                .as_deref()
                .map_or(0.0, |stored| cosine_score(&query_vector, stored));
            let context = if options.include_related {
                Some(self.node_context(&node, walk_kind, options.max_depth).await)
            } else {
                None
            };
            results.push(ContextualResult {
                node,
                score,
                context,
            });
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(options.limit);

        log::debug!(
            "query matched {} nodes (limit {})",
            results.len(),
            options.limit
        );
        Ok(results)
    }

    /// Context for whatever declaration encloses `file_path:line`.
    ///
    /// When several stored spans contain the line the tightest one wins,
    /// so a method beats its class and the class beats the file. `None`
    /// when nothing covers the location.
    pub async fn context_for_location(
        &self,
        file_path: &str,
        line: usize,
    ) -> Result<Option<ContextualResult>> {
        let candidates = self.store.nodes_containing_line(file_path, line).await;
        let Some(node) = candidates
            .into_iter()
            .min_by_key(|n| n.end_line.saturating_sub(n.start_line))
        else {
            return Ok(None);
        };

        let context = self.node_context(&node, None, EXPLORE_DEPTH).await;
        Ok(Some(ContextualResult {
            node,
            score: 1.0,
            context: Some(context),
        }))
    }

    /// Everything reachable from `node_id` over the given edge kinds
    /// (all kinds when empty), ranked by declaration priority: classes
    /// and interfaces first, imports and files last.
    pub async fn find_related_code(
        &self,
        node_id: &str,
        edge_kinds: &[EdgeKind],
    ) -> Result<Vec<CodeNode>> {
        let mut related = self
            .store
            .connected_nodes(node_id, edge_kinds, EXPLORE_DEPTH)
            .await;
        related.sort_by_key(|node| Reverse(node.kind.priority()));
        Ok(related)
    }

    async fn node_context(
        &self,
        node: &CodeNode,
        edge_kind: Option<EdgeKind>,
        depth: usize,
    ) -> NodeContext {
        let mut related_nodes = self
            .store
            .connected_nodes(&node.id, edge_kind.as_slice(), depth)
            .await;
        related_nodes.truncate(RELATED_LIMIT);

        let mut relationships = self.store.get_edges(&node.id, edge_kind).await;
        relationships.truncate(RELATIONSHIP_LIMIT);

        let call_chain = if node.kind.is_callable() {
            self.callers_of(&node.id).await
        } else {
            Vec::new()
        };
        let dependencies = self.dependencies_of(&node.id).await;

        NodeContext {
            related_nodes,
            relationships,
            call_chain,
            dependencies,
        }
    }

    /// Transitive callers of a callable, breadth-first: whoever calls the
    /// node, then whoever calls the callers.
    async fn callers_of(&self, node_id: &str) -> Vec<CodeNode> {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(node_id.to_string());
        let mut queue = VecDeque::from([node_id.to_string()]);
        let mut chain = Vec::new();

        let mut budget = WALK_LIMIT;
        while let Some(current) = queue.pop_front() {
            if budget == 0 {
                break;
            }
            budget -= 1;

            let mut caller_ids = Vec::new();
            for edge in self.store.get_edges(&current, Some(EdgeKind::Calls)).await {
                if edge.target == current && visited.insert(edge.source.clone()) {
                    caller_ids.push(edge.source.clone());
                }
            }
            chain.extend(self.store.get_nodes(&caller_ids).await);
            queue.extend(caller_ids);
        }
        chain
    }

    /// Transitive closure over import-style edges, in either direction.
    async fn dependencies_of(&self, node_id: &str) -> Vec<CodeNode> {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(node_id.to_string());
        let mut queue = VecDeque::from([node_id.to_string()]);
        let mut found = Vec::new();

        let mut budget = WALK_LIMIT;
        while let Some(current) = queue.pop_front() {
            if budget == 0 {
                break;
            }
            budget -= 1;

            let mut next = Vec::new();
            for edge in self.store.get_edges(&current, None).await {
                if !edge.kind.is_dependency() {
                    continue;
                }
                let other = edge.other_endpoint(&current);
                if visited.insert(other.to_string()) {
                    next.push(other.to_string());
                }
            }
            found.extend(self.store.get_nodes(&next).await);
            queue.extend(next);
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_options() {
        let options = SearchOptions::default();
        assert_eq!(options.limit, 10);
        assert_eq!(options.max_depth, 2);
        assert!(options.include_related);
        assert!(options.node_kinds.is_empty());
        assert!(options.edge_kinds.is_empty());
    }

    #[test]
    fn test_option_builders() {
        let options = SearchOptions::default()
            .limit(3)
            .node_kind(NodeKind::Function)
            .edge_kind(EdgeKind::Calls)
            .max_depth(4)
            .without_related();
        assert_eq!(options.limit, 3);
        assert_eq!(options.node_kinds, [NodeKind::Function]);
        assert_eq!(options.edge_kinds, [EdgeKind::Calls]);
        assert_eq!(options.max_depth, 4);
        assert!(!options.include_related);
    }
}
