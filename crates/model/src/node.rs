use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Structural element extracted from a source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeNode {
    /// Deterministic id (see [`crate::node_id`])
    pub id: String,

    /// Element kind
    pub kind: NodeKind,

    /// Declared name (or a synthetic `anonymous_<line>` name)
    pub name: String,

    /// Workspace-relative file path
    pub file_path: String,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    /// Source excerpt, possibly truncated
    pub content: String,

    /// Embedding vector, if one has been computed
    pub embedding: Option<Vec<f32>>,

    /// Language-specific flags (e.g. `is_async`, `is_static`)
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl CodeNode {
    /// Create a node with its id derived from the identifying fields
    #[must_use]
    pub fn new(
        kind: NodeKind,
        name: impl Into<String>,
        file_path: impl Into<String>,
        start_line: usize,
        end_line: usize,
    ) -> Self {
        let name = name.into();
        let file_path = file_path.into();
        let id = crate::node_id(&file_path, kind, &name, start_line);
        Self {
            id,
            kind,
            name,
            file_path,
            start_line,
            end_line,
            content: String::new(),
            embedding: None,
            metadata: HashMap::new(),
        }
    }

    /// Builder: set the source excerpt
    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Builder: set the embedding vector
    #[must_use]
    pub fn embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Builder: add a metadata flag
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Number of lines this node spans
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Check whether a 1-indexed line falls inside this node's span
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

/// Kind of structural element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    Class,
    Interface,
    Function,
    Method,
    Variable,
    Import,
    Export,
    Module,
    Namespace,
    TypeAlias,
    Enum,
    Constant,
}

impl NodeKind {
    /// Wire name stored in point payloads
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Function => "function",
            Self::Method => "method",
            Self::Variable => "variable",
            Self::Import => "import",
            Self::Export => "export",
            Self::Module => "module",
            Self::Namespace => "namespace",
            Self::TypeAlias => "type_alias",
            Self::Enum => "enum",
            Self::Constant => "constant",
        }
    }

    /// Parse a wire name back into a kind
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Self::File),
            "class" => Some(Self::Class),
            "interface" => Some(Self::Interface),
            "function" => Some(Self::Function),
            "method" => Some(Self::Method),
            "variable" => Some(Self::Variable),
            "import" => Some(Self::Import),
            "export" => Some(Self::Export),
            "module" => Some(Self::Module),
            "namespace" => Some(Self::Namespace),
            "type_alias" => Some(Self::TypeAlias),
            "enum" => Some(Self::Enum),
            "constant" => Some(Self::Constant),
            _ => None,
        }
    }

    /// Ranking weight for related-code results (higher = shown first)
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Class => 10,
            Self::Interface => 9,
            Self::Function => 8,
            Self::Method => 7,
            Self::TypeAlias => 6,
            Self::Enum => 5,
            Self::Constant => 4,
            Self::Variable => 3,
            Self::Module | Self::Namespace => 2,
            Self::Import | Self::Export => 1,
            Self::File => 0,
        }
    }

    /// Check if this kind participates in call chains
    #[must_use]
    pub const fn is_callable(self) -> bool {
        matches!(self, Self::Function | Self::Method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_node_id_derived_from_fields() {
        let node = CodeNode::new(NodeKind::Function, "main", "src/main.rs", 3, 10);
        assert_eq!(node.id, crate::node_id("src/main.rs", NodeKind::Function, "main", 3));
    }

    #[test]
    fn test_node_builder() {
        let node = CodeNode::new(NodeKind::Method, "run", "src/app.ts", 5, 9)
            .content("run() {}")
            .embedding(vec![0.1, 0.2])
            .meta("is_async", serde_json::Value::Bool(true));

        assert_eq!(node.content, "run() {}");
        assert_eq!(node.embedding.as_deref(), Some(&[0.1, 0.2][..]));
        assert_eq!(node.metadata.get("is_async"), Some(&serde_json::Value::Bool(true)));
    }

    #[test]
    fn test_contains_line() {
        let node = CodeNode::new(NodeKind::Class, "App", "src/app.ts", 10, 20);
        assert!(node.contains_line(10));
        assert!(node.contains_line(15));
        assert!(node.contains_line(20));
        assert!(!node.contains_line(9));
        assert!(!node.contains_line(21));
        assert_eq!(node.line_count(), 11);
    }

    #[test]
    fn test_kind_round_trip() {
        let kinds = [
            NodeKind::File,
            NodeKind::Class,
            NodeKind::Interface,
            NodeKind::Function,
            NodeKind::Method,
            NodeKind::Variable,
            NodeKind::Import,
            NodeKind::Export,
            NodeKind::Module,
            NodeKind::Namespace,
            NodeKind::TypeAlias,
            NodeKind::Enum,
            NodeKind::Constant,
        ];
        for kind in kinds {
            assert_eq!(NodeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(NodeKind::parse("struct"), None);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(NodeKind::Class.priority() > NodeKind::Interface.priority());
        assert!(NodeKind::Method.priority() > NodeKind::Import.priority());
        assert_eq!(NodeKind::Module.priority(), NodeKind::Namespace.priority());
        assert_eq!(NodeKind::File.priority(), 0);
    }

    #[test]
    fn test_is_callable() {
        assert!(NodeKind::Function.is_callable());
        assert!(NodeKind::Method.is_callable());
        assert!(!NodeKind::Class.is_callable());
        assert!(!NodeKind::File.is_callable());
    }
}
