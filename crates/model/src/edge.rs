use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Typed, directed relationship between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeEdge {
    /// Deterministic id (see [`crate::edge_id`])
    pub id: String,

    /// Source node id
    pub source: String,

    /// Target node id, or a raw identifier when the edge is unresolved
    pub target: String,

    /// Relationship kind
    pub kind: EdgeKind,

    /// Relationship strength
    pub weight: f32,

    /// Flags such as `unresolved`
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl CodeEdge {
    /// Create an edge with its id derived from the endpoints and kind
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
        let source = source.into();
        let target = target.into();
        let id = crate::edge_id(&source, &target, kind);
        Self {
            id,
            source,
            target,
            kind,
            weight: 1.0,
            metadata: HashMap::new(),
        }
    }

    /// Builder: set the relationship weight
    #[must_use]
    pub fn weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Builder: add a metadata flag
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Builder: mark the target as a raw identifier pending resolution
    #[must_use]
    pub fn unresolved(self) -> Self {
        self.meta("unresolved", serde_json::Value::Bool(true))
    }

    /// Check whether the target is still a raw identifier
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        self.metadata
            .get("unresolved")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// The endpoint that is not `node_id` (source if `node_id` is the target)
    #[must_use]
    pub fn other_endpoint(&self, node_id: &str) -> &str {
        if self.source == node_id {
            &self.target
        } else {
            &self.source
        }
    }
}

/// Kind of relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Contains,
    Imports,
    Exports,
    Extends,
    Implements,
    Calls,
    References,
    Defines,
    Uses,
    Overrides,
    Decorates,
    DependsOn,
}

impl EdgeKind {
    /// Wire name stored in point payloads
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Imports => "imports",
            Self::Exports => "exports",
            Self::Extends => "extends",
            Self::Implements => "implements",
            Self::Calls => "calls",
            Self::References => "references",
            Self::Defines => "defines",
            Self::Uses => "uses",
            Self::Overrides => "overrides",
            Self::Decorates => "decorates",
            Self::DependsOn => "depends_on",
        }
    }

    /// Parse a wire name back into a kind
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "contains" => Some(Self::Contains),
            "imports" => Some(Self::Imports),
            "exports" => Some(Self::Exports),
            "extends" => Some(Self::Extends),
            "implements" => Some(Self::Implements),
            "calls" => Some(Self::Calls),
            "references" => Some(Self::References),
            "defines" => Some(Self::Defines),
            "uses" => Some(Self::Uses),
            "overrides" => Some(Self::Overrides),
            "decorates" => Some(Self::Decorates),
            "depends_on" => Some(Self::DependsOn),
            _ => None,
        }
    }

    /// Kinds followed by the dependency-tree walk
    #[must_use]
    pub const fn is_dependency(self) -> bool {
        matches!(self, Self::Imports | Self::DependsOn | Self::Uses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_edge_id_derived_from_fields() {
        let edge = CodeEdge::new("a", "b", EdgeKind::Calls);
        assert_eq!(edge.id, crate::edge_id("a", "b", EdgeKind::Calls));
        assert_eq!(edge.weight, 1.0);
    }

    #[test]
    fn test_unresolved_flag() {
        let edge = CodeEdge::new("a", "BaseService", EdgeKind::Extends).unresolved();
        assert!(edge.is_unresolved());
        assert!(!CodeEdge::new("a", "b", EdgeKind::Calls).is_unresolved());
    }

    #[test]
    fn test_other_endpoint() {
        let edge = CodeEdge::new("a", "b", EdgeKind::Uses);
        assert_eq!(edge.other_endpoint("a"), "b");
        assert_eq!(edge.other_endpoint("b"), "a");
    }

    #[test]
    fn test_kind_round_trip() {
        let kinds = [
            EdgeKind::Contains,
            EdgeKind::Imports,
            EdgeKind::Exports,
            EdgeKind::Extends,
            EdgeKind::Implements,
            EdgeKind::Calls,
            EdgeKind::References,
            EdgeKind::Defines,
            EdgeKind::Uses,
            EdgeKind::Overrides,
            EdgeKind::Decorates,
            EdgeKind::DependsOn,
        ];
        for kind in kinds {
            assert_eq!(EdgeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EdgeKind::parse("linked"), None);
    }

    #[test]
    fn test_dependency_kinds() {
        assert!(EdgeKind::Imports.is_dependency());
        assert!(EdgeKind::DependsOn.is_dependency());
        assert!(EdgeKind::Uses.is_dependency());
        assert!(!EdgeKind::Calls.is_dependency());
        assert!(!EdgeKind::Contains.is_dependency());
    }
}
