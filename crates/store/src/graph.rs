//! Graph storage for one workspace: nodes and edges as points in two
//! collections, with traversal queries layered on top.
//!
//! Writes propagate errors to the caller. Reads degrade to empty results
//! with a warning, so a partially populated graph never aborts a traversal.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use codegraph_model::{CodeEdge, CodeNode, EdgeKind, GraphBatch, NodeKind};
use log::{debug, info, warn};
use sha2::{Digest, Sha256};

use crate::codec::{edge_to_point, node_to_point, point_to_edge, point_to_node};
use crate::{
    CollectionSpec, DistanceKind, FieldCondition, GraphStoreConfig, PayloadIndexKind, PointFilter,
    PointStore, Result, StoreError,
};

/// Cap for one filtered edge/node listing. A single frontier is never
/// expected to touch anywhere near this many points.
const SCROLL_LIMIT: usize = 10_000;

/// Induced neighborhood returned by [`GraphStore::subgraph`]
#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    pub nodes: Vec<CodeNode>,
    pub edges: Vec<CodeEdge>,
}

/// Durable, queryable node/edge storage for one workspace
pub struct GraphStore {
    backend: Arc<dyn PointStore>,
    config: GraphStoreConfig,
    nodes_collection: String,
    edges_collection: String,
}

/// Stable 64-bit fingerprint of the workspace root, so collections from
/// different workspaces never collide on a shared backend.
fn workspace_fingerprint(root: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(root.as_bytes());
    let digest = hasher.finalize();
    u64::from_be_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}

impl GraphStore {
    /// Create a store for the workspace named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(backend: Arc<dyn PointStore>, config: GraphStoreConfig) -> Result<Self> {
        config.validate().map_err(StoreError::InvalidConfig)?;
        let fingerprint = workspace_fingerprint(&config.workspace_root);
        Ok(Self {
            nodes_collection: format!("codegraph_nodes_{fingerprint:016x}"),
            edges_collection: format!("codegraph_edges_{fingerprint:016x}"),
            backend,
            config,
        })
    }

    /// Name of the nodes collection
    #[must_use]
    pub fn nodes_collection(&self) -> &str {
        &self.nodes_collection
    }

    /// Name of the edges collection
    #[must_use]
    pub fn edges_collection(&self) -> &str {
        &self.edges_collection
    }

    /// Create both collections and their payload indexes.
    ///
    /// Idempotent: "already exists" conflicts from a previous run are
    /// swallowed. Any other backend error propagates.
    ///
    /// # Errors
    ///
    /// Returns an error if collection or index creation fails.
    pub async fn initialize(&self) -> Result<()> {
        self.create_with_indexes(
            &self.nodes_collection,
            CollectionSpec {
                vector_size: self.config.vector_size,
                distance: DistanceKind::Cosine,
                on_disk: self.config.on_disk,
            },
            &[
                ("kind", PayloadIndexKind::Keyword),
                ("name", PayloadIndexKind::Keyword),
                ("file_path", PayloadIndexKind::Keyword),
                ("start_line", PayloadIndexKind::Integer),
                ("end_line", PayloadIndexKind::Integer),
            ],
        )
        .await?;
        // The 1-dim weight vector only satisfies the collection schema;
        // nothing ever runs similarity search over edges.
        self.create_with_indexes(
            &self.edges_collection,
            CollectionSpec {
                vector_size: 1,
                distance: DistanceKind::Dot,
                on_disk: self.config.on_disk,
            },
            &[
                ("source", PayloadIndexKind::Keyword),
                ("target", PayloadIndexKind::Keyword),
                ("kind", PayloadIndexKind::Keyword),
                ("weight", PayloadIndexKind::Float),
            ],
        )
        .await?;
        info!(
            "graph store ready: {} / {}",
            self.nodes_collection, self.edges_collection
        );
        Ok(())
    }

    async fn create_with_indexes(
        &self,
        name: &str,
        spec: CollectionSpec,
        indexes: &[(&str, PayloadIndexKind)],
    ) -> Result<()> {
        match self.backend.create_collection(name, &spec).await {
            Ok(()) => {
                for (field, kind) in indexes {
                    match self.backend.create_payload_index(name, field, *kind).await {
                        Ok(()) => {}
                        Err(e) if e.is_already_exists() => {}
                        Err(e) => return Err(e),
                    }
                }
                Ok(())
            }
            Err(e) if e.is_already_exists() => {
                debug!("collection {name} already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Upsert a single node; last write wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend upsert fails.
    pub async fn add_node(&self, node: &CodeNode) -> Result<()> {
        self.backend
            .upsert(
                &self.nodes_collection,
                vec![node_to_point(node, self.config.vector_size)],
            )
            .await
    }

    /// Upsert many nodes in one backend call.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend upsert fails.
    pub async fn add_nodes(&self, nodes: &[CodeNode]) -> Result<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        let points = nodes
            .iter()
            .map(|n| node_to_point(n, self.config.vector_size))
            .collect();
        self.backend.upsert(&self.nodes_collection, points).await
    }

    /// Upsert a single edge; last write wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend upsert fails.
    pub async fn add_edge(&self, edge: &CodeEdge) -> Result<()> {
        self.backend
            .upsert(&self.edges_collection, vec![edge_to_point(edge)])
            .await
    }

    /// Upsert many edges in one backend call.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend upsert fails.
    pub async fn add_edges(&self, edges: &[CodeEdge]) -> Result<()> {
        if edges.is_empty() {
            return Ok(());
        }
        let points = edges.iter().map(edge_to_point).collect();
        self.backend.upsert(&self.edges_collection, points).await
    }

    /// Upsert one extracted file's nodes and edges.
    ///
    /// # Errors
    ///
    /// Returns an error if either upsert fails.
    pub async fn add_batch(&self, batch: &GraphBatch) -> Result<()> {
        self.add_nodes(&batch.nodes).await?;
        self.add_edges(&batch.edges).await
    }

    /// Point lookup; `None` on any failure, including not-found.
    pub async fn get_node(&self, id: &str) -> Option<CodeNode> {
        match self
            .backend
            .retrieve(&self.nodes_collection, &[id.to_string()])
            .await
        {
            Ok(points) => points.into_iter().next().and_then(|p| match point_to_node(p) {
                Ok(node) => Some(node),
                Err(e) => {
                    warn!("discarding undecodable node {id}: {e}");
                    None
                }
            }),
            Err(e) => {
                warn!("get_node({id}) failed: {e}");
                None
            }
        }
    }

    /// Fetch many nodes, preserving the requested id order; missing or
    /// undecodable points are skipped.
    pub async fn get_nodes(&self, ids: &[String]) -> Vec<CodeNode> {
        if ids.is_empty() {
            return Vec::new();
        }
        match self.backend.retrieve(&self.nodes_collection, ids).await {
            Ok(points) => {
                let mut by_id: HashMap<String, CodeNode> = HashMap::new();
                for point in points {
                    match point_to_node(point) {
                        Ok(node) => {
                            by_id.insert(node.id.clone(), node);
                        }
                        Err(e) => warn!("discarding undecodable node: {e}"),
                    }
                }
                ids.iter().filter_map(|id| by_id.remove(id)).collect()
            }
            Err(e) => {
                warn!("get_nodes failed: {e}");
                Vec::new()
            }
        }
    }

    /// All edges where the node is source or target, optionally filtered
    /// to one kind.
    pub async fn get_edges(&self, node_id: &str, kind: Option<EdgeKind>) -> Vec<CodeEdge> {
        self.edges_touching(&[node_id.to_string()], kind.as_slice())
            .await
    }

    /// One filtered scroll for every edge touching any id in `ids`. An
    /// empty `kinds` slice matches every edge kind.
    async fn edges_touching(&self, ids: &[String], kinds: &[EdgeKind]) -> Vec<CodeEdge> {
        if ids.is_empty() {
            return Vec::new();
        }
        let mut filter = PointFilter::new()
            .should(FieldCondition::any_text("source", ids.to_vec()))
            .should(FieldCondition::any_text("target", ids.to_vec()));
        match kinds {
            [] => {}
            [kind] => filter = filter.must(FieldCondition::text("kind", kind.as_str())),
            _ => {
                let names = kinds.iter().map(|k| k.as_str().to_string()).collect();
                filter = filter.must(FieldCondition::any_text("kind", names));
            }
        }
        match self
            .backend
            .scroll(&self.edges_collection, Some(&filter), SCROLL_LIMIT)
            .await
        {
            Ok(points) => points
                .into_iter()
                .filter_map(|p| match point_to_edge(p) {
                    Ok(edge) => Some(edge),
                    Err(e) => {
                        warn!("discarding undecodable edge: {e}");
                        None
                    }
                })
                .collect(),
            Err(e) => {
                warn!("edge lookup failed: {e}");
                Vec::new()
            }
        }
    }

    /// Breadth-first neighborhood of `node_id` up to `depth` hops,
    /// traversing only edges whose kind is in `kinds` (empty = all).
    ///
    /// The start node is never part of the result, cycles are visited at
    /// most once, and `depth == 0` yields nothing. Each depth level costs
    /// one batched edge scroll plus one batched node retrieve for the
    /// whole frontier.
    pub async fn connected_nodes(
        &self,
        node_id: &str,
        kinds: &[EdgeKind],
        depth: usize,
    ) -> Vec<CodeNode> {
        if depth == 0 {
            return Vec::new();
        }
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(node_id.to_string());
        let mut frontier = vec![node_id.to_string()];
        let mut result = Vec::new();

        for _ in 0..depth {
            if frontier.is_empty() {
                break;
            }
            let edges = self.edges_touching(&frontier, kinds).await;
            let frontier_set: HashSet<&str> = frontier.iter().map(String::as_str).collect();
            let mut next = Vec::new();
            for edge in &edges {
                if frontier_set.contains(edge.source.as_str()) && visited.insert(edge.target.clone())
                {
                    next.push(edge.target.clone());
                }
                if frontier_set.contains(edge.target.as_str()) && visited.insert(edge.source.clone())
                {
                    next.push(edge.source.clone());
                }
            }
            // Unresolved raw-name endpoints simply fail to retrieve; they
            // stay in the frontier so shared names still bridge levels.
            result.extend(self.get_nodes(&next).await);
            frontier = next;
        }
        result
    }

    /// Nearest-neighbor search over node embeddings.
    pub async fn search_similar_nodes(
        &self,
        embedding: &[f32],
        limit: usize,
        kind: Option<NodeKind>,
    ) -> Vec<CodeNode> {
        let filter = kind.map(|k| PointFilter::new().must(FieldCondition::text("kind", k.as_str())));
        match self
            .backend
            .query(&self.nodes_collection, embedding, filter.as_ref(), limit)
            .await
        {
            Ok(scored) => scored
                .into_iter()
                .filter_map(|s| match point_to_node(s.point) {
                    Ok(node) => Some(node),
                    Err(e) => {
                        warn!("discarding undecodable node: {e}");
                        None
                    }
                })
                .collect(),
            Err(e) => {
                warn!("similarity search failed: {e}");
                Vec::new()
            }
        }
    }

    /// Induced subgraph around `node_id`: the node, its neighborhood up to
    /// `depth`, and every stored edge with both endpoints inside that set.
    ///
    /// The root is always first in the node list. An unknown root yields an
    /// empty subgraph.
    pub async fn subgraph(&self, node_id: &str, depth: usize) -> Subgraph {
        let Some(root) = self.get_node(node_id).await else {
            return Subgraph::default();
        };
        let connected = self.connected_nodes(node_id, &[], depth).await;

        let mut ids: Vec<String> = Vec::with_capacity(connected.len() + 1);
        ids.push(root.id.clone());
        ids.extend(connected.iter().map(|n| n.id.clone()));
        let id_set: HashSet<&str> = ids.iter().map(String::as_str).collect();

        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for edge in self.edges_touching(&ids, &[]).await {
            if id_set.contains(edge.source.as_str())
                && id_set.contains(edge.target.as_str())
                && seen.insert(edge.id.clone())
            {
                edges.push(edge);
            }
        }

        let mut nodes = vec![root];
        nodes.extend(connected);
        Subgraph { nodes, edges }
    }

    /// Nodes in `file_path` whose `[start_line, end_line]` span contains
    /// `line`, via the payload range indexes.
    pub async fn nodes_containing_line(&self, file_path: &str, line: usize) -> Vec<CodeNode> {
        let Ok(line) = i64::try_from(line) else {
            return Vec::new();
        };
        let filter = PointFilter::new()
            .must(FieldCondition::text("file_path", file_path))
            .must(FieldCondition::range("start_line", None, Some(line)))
            .must(FieldCondition::range("end_line", Some(line), None));
        match self
            .backend
            .scroll(&self.nodes_collection, Some(&filter), SCROLL_LIMIT)
            .await
        {
            Ok(points) => points
                .into_iter()
                .filter_map(|p| match point_to_node(p) {
                    Ok(node) => Some(node),
                    Err(e) => {
                        warn!("discarding undecodable node: {e}");
                        None
                    }
                })
                .collect(),
            Err(e) => {
                warn!("location lookup failed: {e}");
                Vec::new()
            }
        }
    }

    /// Delete every node extracted from `file_path` plus all edges touching
    /// those nodes (outgoing and incoming). Returns the number of points
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend scroll or delete fails.
    pub async fn remove_file(&self, file_path: &str) -> Result<usize> {
        let filter = PointFilter::new().must(FieldCondition::text("file_path", file_path));
        let points = self
            .backend
            .scroll(&self.nodes_collection, Some(&filter), SCROLL_LIMIT)
            .await?;
        if points.is_empty() {
            return Ok(0);
        }
        let node_ids: Vec<String> = points.into_iter().map(|p| p.id).collect();

        let touching = PointFilter::new()
            .should(FieldCondition::any_text("source", node_ids.clone()))
            .should(FieldCondition::any_text("target", node_ids.clone()));
        let edge_ids: Vec<String> = self
            .backend
            .scroll(&self.edges_collection, Some(&touching), SCROLL_LIMIT)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        if !edge_ids.is_empty() {
            self.backend
                .delete_points(&self.edges_collection, &edge_ids)
                .await?;
        }
        self.backend
            .delete_points(&self.nodes_collection, &node_ids)
            .await?;

        let removed = node_ids.len() + edge_ids.len();
        info!("removed {removed} points for {file_path}");
        Ok(removed)
    }

    /// Drop and recreate both collections.
    ///
    /// # Errors
    ///
    /// Returns an error if a delete (other than "does not exist") or the
    /// re-initialization fails.
    pub async fn clear(&self) -> Result<()> {
        for name in [&self.nodes_collection, &self.edges_collection] {
            match self.backend.delete_collection(name).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        self.initialize().await
    }

    /// Filtered listing over stored nodes (write-phase helper; errors
    /// propagate).
    pub(crate) async fn scroll_nodes(
        &self,
        filter: Option<&PointFilter>,
        limit: usize,
    ) -> Result<Vec<CodeNode>> {
        let points = self
            .backend
            .scroll(&self.nodes_collection, filter, limit)
            .await?;
        Ok(points
            .into_iter()
            .filter_map(|p| match point_to_node(p) {
                Ok(node) => Some(node),
                Err(e) => {
                    warn!("discarding undecodable node: {e}");
                    None
                }
            })
            .collect())
    }

    /// Filtered listing over stored edges (write-phase helper; errors
    /// propagate).
    pub(crate) async fn scroll_edges(
        &self,
        filter: Option<&PointFilter>,
        limit: usize,
    ) -> Result<Vec<CodeEdge>> {
        let points = self
            .backend
            .scroll(&self.edges_collection, filter, limit)
            .await?;
        Ok(points
            .into_iter()
            .filter_map(|p| match point_to_edge(p) {
                Ok(edge) => Some(edge),
                Err(e) => {
                    warn!("discarding undecodable edge: {e}");
                    None
                }
            })
            .collect())
    }

    pub(crate) async fn delete_edges(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.backend.delete_points(&self.edges_collection, ids).await
    }
}
