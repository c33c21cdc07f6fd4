//! Second-pass resolution of raw-name edge targets.
//!
//! Heritage clauses are extracted file by file, before their targets are
//! guaranteed to exist in the graph, so those edges initially point at bare
//! names. Once every file has been ingested, a linking pass rewrites each
//! raw-name edge whose target now maps to exactly one stored declaration.

use std::collections::{HashMap, HashSet};

use codegraph_model::{CodeEdge, CodeNode, NodeKind};
use log::{debug, info};

use crate::{FieldCondition, GraphStore, PointFilter, Result};

/// Whole-graph listings paginate internally; no practical cap.
const LINK_SCAN_LIMIT: usize = usize::MAX;

/// Outcome counts from one linking pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkReport {
    /// Edges rewritten to point at a declaration id
    pub resolved: usize,

    /// Raw names matching several declarations, none unique to the
    /// source's file
    pub ambiguous: usize,

    /// Raw names matching no stored declaration
    pub unknown: usize,
}

enum Resolution {
    Resolved(String),
    Ambiguous,
    Unknown,
}

/// Rewrites unresolved edges against the declarations currently stored
pub struct ReferenceLinker<'a> {
    store: &'a GraphStore,
}

impl<'a> ReferenceLinker<'a> {
    #[must_use]
    pub const fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Run one linking pass over the whole graph.
    ///
    /// Safe to repeat: already-resolved edges are never touched, and edges
    /// that stay dangling are left in place for a later pass.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend read or write fails.
    pub async fn link(&self) -> Result<LinkReport> {
        let unresolved: Vec<CodeEdge> = self
            .store
            .scroll_edges(None, LINK_SCAN_LIMIT)
            .await?
            .into_iter()
            .filter(CodeEdge::is_unresolved)
            .collect();
        if unresolved.is_empty() {
            return Ok(LinkReport::default());
        }

        let declarations = self.declaration_index().await?;
        let source_files = self.source_files(&unresolved).await;

        let mut report = LinkReport::default();
        let mut stale_ids = Vec::new();
        let mut rewritten = Vec::new();

        for edge in &unresolved {
            match resolve_target(edge, &declarations, &source_files) {
                Resolution::Resolved(target_id) => {
                    let mut metadata = edge.metadata.clone();
                    metadata.remove("unresolved");
                    let mut replacement =
                        CodeEdge::new(&edge.source, &target_id, edge.kind).weight(edge.weight);
                    replacement.metadata = metadata;
                    stale_ids.push(edge.id.clone());
                    rewritten.push(replacement);
                    report.resolved += 1;
                }
                Resolution::Ambiguous => report.ambiguous += 1,
                Resolution::Unknown => report.unknown += 1,
            }
        }

        // Add before delete: if the delete fails the pass can be re-run,
        // whereas the reverse order could drop edges outright.
        self.store.add_edges(&rewritten).await?;
        self.store.delete_edges(&stale_ids).await?;
        info!(
            "link pass: {} resolved, {} ambiguous, {} unknown",
            report.resolved, report.ambiguous, report.unknown
        );
        Ok(report)
    }

    /// Names of type-like declarations mapped to the nodes declaring them.
    async fn declaration_index(&self) -> Result<HashMap<String, Vec<CodeNode>>> {
        let kinds: Vec<String> = [
            NodeKind::Class,
            NodeKind::Interface,
            NodeKind::Enum,
            NodeKind::TypeAlias,
        ]
        .iter()
        .map(|k| k.as_str().to_string())
        .collect();
        let filter = PointFilter::new().must(FieldCondition::any_text("kind", kinds));
        let nodes = self
            .store
            .scroll_nodes(Some(&filter), LINK_SCAN_LIMIT)
            .await?;

        let mut index: HashMap<String, Vec<CodeNode>> = HashMap::new();
        for node in nodes {
            index.entry(node.name.clone()).or_default().push(node);
        }
        Ok(index)
    }

    /// File of each distinct source node, for same-file disambiguation.
    async fn source_files(&self, edges: &[CodeEdge]) -> HashMap<String, String> {
        let ids: Vec<String> = edges
            .iter()
            .map(|e| e.source.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        self.store
            .get_nodes(&ids)
            .await
            .into_iter()
            .map(|n| (n.id, n.file_path))
            .collect()
    }
}

fn resolve_target(
    edge: &CodeEdge,
    declarations: &HashMap<String, Vec<CodeNode>>,
    source_files: &HashMap<String, String>,
) -> Resolution {
    let Some(candidates) = declarations.get(&edge.target) else {
        return Resolution::Unknown;
    };
    match candidates.as_slice() {
        [] => Resolution::Unknown,
        [only] => Resolution::Resolved(only.id.clone()),
        many => {
            let Some(source_file) = source_files.get(&edge.source) else {
                debug!("no source node for edge {}; leaving it dangling", edge.id);
                return Resolution::Ambiguous;
            };
            let mut in_file = many.iter().filter(|n| &n.file_path == source_file);
            match (in_file.next(), in_file.next()) {
                (Some(single), None) => Resolution::Resolved(single.id.clone()),
                _ => Resolution::Ambiguous,
            }
        }
    }
}
