use std::ffi::OsStr;
use std::path::Path;

use codegraph_model::{CodeEdge, CodeNode, EdgeKind, GraphBatch, NodeKind};
use log::debug;
use serde_json::json;
use tree_sitter::{Node, Parser};

use crate::error::{ExtractError, Result};
use crate::language::Language;

/// Stored node content is capped to this many characters
const CONTENT_PREVIEW_LIMIT: usize = 500;

/// File-wide inputs shared by every visitor call
struct FileContext<'a> {
    source: &'a str,
    file_path: &'a str,
    file_id: &'a str,
}

/// Nearest enclosing declaration that owns CONTAINS edges for its descendants
#[derive(Clone)]
struct Container {
    id: String,
    kind: NodeKind,
}

/// AST-based extractor producing the node/edge batch for one source file
pub struct RelationshipExtractor {
    parser: Parser,
    language: Language,
}

impl RelationshipExtractor {
    /// Create an extractor for a language
    pub fn new(language: Language) -> Result<Self> {
        let ts_language = language.tree_sitter_language()?;
        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|e| ExtractError::tree_sitter(format!("Failed to set language: {e}")))?;

        Ok(Self { parser, language })
    }

    /// Create an extractor for the language inferred from a file path
    pub fn for_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(Language::from_path(path))
    }

    /// Language this extractor parses
    pub fn language(&self) -> Language {
        self.language
    }

    /// Parse `content` and derive the file's nodes and edges.
    ///
    /// The FILE node always comes first in the batch; every other node is
    /// attached to it through one or more containment-style edges.
    pub fn extract(&mut self, content: &str, file_path: &str) -> Result<GraphBatch> {
        let tree = self
            .parser
            .parse(content, None)
            .ok_or_else(|| ExtractError::parse("Failed to parse source code"))?;
        let root = tree.root_node();

        let mut batch = GraphBatch::new();
        let file_node = Self::file_node(content, file_path);
        let file = Container {
            id: file_node.id.clone(),
            kind: NodeKind::File,
        };
        let ctx = FileContext {
            source: content,
            file_path,
            file_id: &file.id,
        };
        batch.push_node(file_node);

        match self.language {
            Language::JavaScript | Language::TypeScript => {
                self.visit_typescript(&ctx, root, &file, &mut batch);
            }
            Language::Python => self.visit_python(&ctx, root, &file, &mut batch),
            _ => self.visit_generic(&ctx, root, &mut batch),
        }

        Ok(batch)
    }

    /// One FILE node per extraction, spanning the whole file
    fn file_node(content: &str, file_path: &str) -> CodeNode {
        let name = Path::new(file_path)
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or(file_path);
        let line_count = content.lines().count().max(1);
        CodeNode::new(NodeKind::File, name, file_path, 1, line_count).content(preview(content))
    }

    // --- TypeScript / JavaScript ---

    fn visit_typescript(
        &self,
        ctx: &FileContext,
        node: Node,
        container: &Container,
        batch: &mut GraphBatch,
    ) {
        match node.kind() {
            "import_statement" => self.emit_import(ctx, node, batch),
            "class_declaration" | "abstract_class_declaration" => {
                // Unnamed classes produce no node but their members are
                // still walked against the outer container.
                match self.emit_typescript_class(ctx, node, container, batch) {
                    Some(class) => self.walk_typescript(ctx, node, &class, batch),
                    None => self.walk_typescript(ctx, node, container, batch),
                }
            }
            "interface_declaration" => {
                // Interface members are signatures, not declarations; only
                // the interface itself lands in the graph.
                self.emit_declaration(ctx, node, NodeKind::Interface, container, batch);
            }
            "type_alias_declaration" => {
                self.emit_declaration(ctx, node, NodeKind::TypeAlias, container, batch);
            }
            "enum_declaration" => {
                self.emit_declaration(ctx, node, NodeKind::Enum, container, batch);
            }
            "function_declaration"
            | "generator_function_declaration"
            | "function_expression"
            | "arrow_function" => {
                let function = self.emit_typescript_function(ctx, node, container, batch);
                self.walk_typescript(ctx, node, &function, batch);
            }
            "method_definition" => {
                match self.emit_typescript_method(ctx, node, container, batch) {
                    Some(method) => self.walk_typescript(ctx, node, &method, batch),
                    None => self.walk_typescript(ctx, node, container, batch),
                }
            }
            "export_statement" => {
                self.emit_export(ctx, node, batch);
                // The exported declaration itself is still a construct of
                // this file; keep walking so it gets its own node.
                self.walk_typescript(ctx, node, container, batch);
            }
            _ => self.walk_typescript(ctx, node, container, batch),
        }
    }

    fn walk_typescript(
        &self,
        ctx: &FileContext,
        node: Node,
        container: &Container,
        batch: &mut GraphBatch,
    ) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit_typescript(ctx, child, container, batch);
        }
    }

    fn emit_typescript_class(
        &self,
        ctx: &FileContext,
        node: Node,
        container: &Container,
        batch: &mut GraphBatch,
    ) -> Option<Container> {
        let Some(name) = Self::name_field(ctx.source, node) else {
            debug!(
                "skipping unnamed class at {}:{}",
                ctx.file_path,
                node.start_position().row + 1
            );
            return None;
        };

        let class_node = self.new_node(ctx, NodeKind::Class, &name, node);
        let class = Container {
            id: class_node.id.clone(),
            kind: NodeKind::Class,
        };
        batch.push_edge(CodeEdge::new(&container.id, &class.id, EdgeKind::Contains));
        self.emit_heritage(ctx, node, &class.id, batch);
        batch.push_node(class_node);
        Some(class)
    }

    /// EXTENDS/IMPLEMENTS edges towards raw superclass names, resolved later
    fn emit_heritage(
        &self,
        ctx: &FileContext,
        class_node: Node,
        class_id: &str,
        batch: &mut GraphBatch,
    ) {
        let Some(heritage) = Self::child_of_kind(class_node, "class_heritage") else {
            return;
        };

        let mut saw_clause = false;
        let mut cursor = heritage.walk();
        for clause in heritage.children(&mut cursor) {
            let edge_kind = match clause.kind() {
                "extends_clause" => EdgeKind::Extends,
                "implements_clause" => EdgeKind::Implements,
                _ => continue,
            };
            saw_clause = true;
            for target in Self::heritage_targets(ctx.source, clause) {
                batch.push_edge(CodeEdge::new(class_id, &target, edge_kind).unresolved());
            }
        }

        if !saw_clause {
            // JavaScript heritage is a bare `extends <expression>` with no
            // clause wrapper.
            for target in Self::heritage_targets(ctx.source, heritage) {
                batch.push_edge(CodeEdge::new(class_id, &target, EdgeKind::Extends).unresolved());
            }
        }
    }

    fn heritage_targets(source: &str, clause: Node) -> Vec<String> {
        let mut targets = Vec::new();
        let mut cursor = clause.walk();
        for child in clause.children(&mut cursor) {
            if !child.is_named() || child.kind() == "type_arguments" {
                continue;
            }
            // Generic arguments are not part of the referenced name.
            let text = Self::node_text(source, child);
            let name = text.split('<').next().unwrap_or(text).trim();
            if !name.is_empty() {
                targets.push(name.to_string());
            }
        }
        targets
    }

    /// Interfaces, type aliases and enums: one node plus containment
    fn emit_declaration(
        &self,
        ctx: &FileContext,
        node: Node,
        kind: NodeKind,
        container: &Container,
        batch: &mut GraphBatch,
    ) {
        let Some(name) = Self::name_field(ctx.source, node) else {
            return;
        };
        let code_node = self.new_node(ctx, kind, &name, node);
        batch.push_edge(CodeEdge::new(
            &container.id,
            &code_node.id,
            EdgeKind::Contains,
        ));
        batch.push_node(code_node);
    }

    fn emit_typescript_function(
        &self,
        ctx: &FileContext,
        node: Node,
        container: &Container,
        batch: &mut GraphBatch,
    ) -> Container {
        let start_line = node.start_position().row + 1;
        let name = Self::name_field(ctx.source, node)
            .or_else(|| Self::binding_name(ctx.source, node))
            .unwrap_or_else(|| format!("anonymous_{start_line}"));

        let mut function_node = self.new_node(ctx, NodeKind::Function, &name, node);
        if Self::has_token(node, "async") {
            function_node = function_node.meta("is_async", json!(true));
        }

        let function = Container {
            id: function_node.id.clone(),
            kind: NodeKind::Function,
        };
        batch.push_edge(CodeEdge::new(
            &container.id,
            &function.id,
            EdgeKind::Contains,
        ));
        batch.push_node(function_node);
        function
    }

    fn emit_typescript_method(
        &self,
        ctx: &FileContext,
        node: Node,
        container: &Container,
        batch: &mut GraphBatch,
    ) -> Option<Container> {
        let name = Self::name_field(ctx.source, node)?;

        // Object-literal methods parse as method_definition too; only class
        // members become METHOD nodes.
        let kind = if container.kind == NodeKind::Class {
            NodeKind::Method
        } else {
            NodeKind::Function
        };

        let mut method_node = self.new_node(ctx, kind, &name, node);
        if Self::has_token(node, "async") {
            method_node = method_node.meta("is_async", json!(true));
        }
        if Self::has_token(node, "static") {
            method_node = method_node.meta("is_static", json!(true));
        }
        if Self::is_private_member(ctx.source, node, &name) {
            method_node = method_node.meta("is_private", json!(true));
        }

        let method = Container {
            id: method_node.id.clone(),
            kind,
        };
        batch.push_edge(CodeEdge::new(&container.id, &method.id, EdgeKind::Contains));
        batch.push_node(method_node);
        Some(method)
    }

    fn emit_import(&self, ctx: &FileContext, node: Node, batch: &mut GraphBatch) {
        let Some(source_node) = node.child_by_field_name("source") else {
            return;
        };
        let name = Self::node_text(ctx.source, source_node)
            .trim_matches(['"', '\'', '`'])
            .to_string();
        if name.is_empty() {
            return;
        }

        let import_node = self.new_node(ctx, NodeKind::Import, &name, node);
        batch.push_edge(CodeEdge::new(
            ctx.file_id,
            &import_node.id,
            EdgeKind::Imports,
        ));
        batch.push_node(import_node);
    }

    fn emit_export(&self, ctx: &FileContext, node: Node, batch: &mut GraphBatch) {
        let start_line = node.start_position().row + 1;
        let name = Self::export_name(ctx.source, node)
            .unwrap_or_else(|| format!("export_{start_line}"));

        let export_node = self.new_node(ctx, NodeKind::Export, &name, node);
        batch.push_edge(CodeEdge::new(
            ctx.file_id,
            &export_node.id,
            EdgeKind::Exports,
        ));
        batch.push_node(export_node);
    }

    /// Name of the exported declaration, or of the first export specifier
    fn export_name(source: &str, node: Node) -> Option<String> {
        if let Some(declaration) = node.child_by_field_name("declaration") {
            if let Some(name) = declaration.child_by_field_name("name") {
                return Some(Self::node_text(source, name).to_string());
            }
            // export const X = …: the declarator holds the name
            let declarator = Self::child_of_kind(declaration, "variable_declarator")?;
            return declarator
                .child_by_field_name("name")
                .map(|n| Self::node_text(source, n).to_string());
        }

        // export { A, B } from './x'
        let clause = Self::child_of_kind(node, "export_clause")?;
        let specifier = Self::child_of_kind(clause, "export_specifier")?;
        specifier
            .child_by_field_name("name")
            .map(|n| Self::node_text(source, n).to_string())
    }

    // --- Python ---

    fn visit_python(
        &self,
        ctx: &FileContext,
        node: Node,
        container: &Container,
        batch: &mut GraphBatch,
    ) {
        match node.kind() {
            "import_statement" | "import_from_statement" => {
                self.emit_python_import(ctx, node, batch);
            }
            "class_definition" => match self.emit_python_class(ctx, node, container, batch) {
                Some(class) => self.walk_python(ctx, node, &class, batch),
                None => self.walk_python(ctx, node, container, batch),
            },
            "function_definition" => {
                let function = self.emit_python_function(ctx, node, container, batch);
                self.walk_python(ctx, node, &function, batch);
            }
            _ => self.walk_python(ctx, node, container, batch),
        }
    }

    fn walk_python(
        &self,
        ctx: &FileContext,
        node: Node,
        container: &Container,
        batch: &mut GraphBatch,
    ) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit_python(ctx, child, container, batch);
        }
    }

    fn emit_python_import(&self, ctx: &FileContext, node: Node, batch: &mut GraphBatch) {
        // `from m import a` names the module; `import a, b` names the first
        // imported path.
        let module = node
            .child_by_field_name("module_name")
            .or_else(|| node.child_by_field_name("name"));
        let Some(module) = module else {
            return;
        };
        let name = Self::node_text(ctx.source, module).to_string();
        if name.is_empty() {
            return;
        }

        let import_node = self.new_node(ctx, NodeKind::Import, &name, node);
        batch.push_edge(CodeEdge::new(
            ctx.file_id,
            &import_node.id,
            EdgeKind::Imports,
        ));
        batch.push_node(import_node);
    }

    fn emit_python_class(
        &self,
        ctx: &FileContext,
        node: Node,
        container: &Container,
        batch: &mut GraphBatch,
    ) -> Option<Container> {
        let Some(name) = Self::name_field(ctx.source, node) else {
            debug!(
                "skipping unnamed class at {}:{}",
                ctx.file_path,
                node.start_position().row + 1
            );
            return None;
        };

        let class_node = self.new_node(ctx, NodeKind::Class, &name, node);
        let class = Container {
            id: class_node.id.clone(),
            kind: NodeKind::Class,
        };
        batch.push_edge(CodeEdge::new(&container.id, &class.id, EdgeKind::Contains));

        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            let mut cursor = superclasses.walk();
            for argument in superclasses.children(&mut cursor) {
                // `Generic[T]` parses as a subscript; the base name is its
                // value. Keyword arguments (metaclass=…) are not heritage.
                let target = match argument.kind() {
                    "identifier" | "attribute" => {
                        Some(Self::node_text(ctx.source, argument).to_string())
                    }
                    "subscript" => argument
                        .child_by_field_name("value")
                        .map(|n| Self::node_text(ctx.source, n).to_string()),
                    _ => None,
                };
                if let Some(target) = target.filter(|t| !t.is_empty()) {
                    batch.push_edge(
                        CodeEdge::new(&class.id, &target, EdgeKind::Extends).unresolved(),
                    );
                }
            }
        }

        batch.push_node(class_node);
        Some(class)
    }

    fn emit_python_function(
        &self,
        ctx: &FileContext,
        node: Node,
        container: &Container,
        batch: &mut GraphBatch,
    ) -> Container {
        let start_line = node.start_position().row + 1;
        let name = Self::name_field(ctx.source, node)
            .unwrap_or_else(|| format!("anonymous_{start_line}"));

        let kind = if container.kind == NodeKind::Class {
            NodeKind::Method
        } else {
            NodeKind::Function
        };

        let mut function_node = self.new_node(ctx, kind, &name, node);
        if Self::has_token(node, "async") {
            function_node = function_node.meta("is_async", json!(true));
        }
        if kind == NodeKind::Method {
            if Self::python_has_decorator(ctx.source, node, "staticmethod") {
                function_node = function_node.meta("is_static", json!(true));
            }
            // Leading underscore marks a private member; dunders are
            // protocol hooks, not private.
            let private = name.starts_with('_') && !(name.starts_with("__") && name.ends_with("__"));
            if private {
                function_node = function_node.meta("is_private", json!(true));
            }
        }

        let function = Container {
            id: function_node.id.clone(),
            kind,
        };
        batch.push_edge(CodeEdge::new(
            &container.id,
            &function.id,
            EdgeKind::Contains,
        ));
        batch.push_node(function_node);
        function
    }

    fn python_has_decorator(source: &str, node: Node, decorator: &str) -> bool {
        let Some(parent) = node.parent() else {
            return false;
        };
        if parent.kind() != "decorated_definition" {
            return false;
        }
        let mut cursor = parent.walk();
        let found = parent.children(&mut cursor).any(|child| {
            child.kind() == "decorator" && Self::node_text(source, child).contains(decorator)
        });
        found
    }

    // --- Generic fallback ---

    /// Looser rule for languages without a dedicated visitor: kind names
    /// containing "function"/"method" or "class"/"struct" become FUNCTION or
    /// CLASS nodes, all attached directly to the file.
    fn visit_generic(&self, ctx: &FileContext, node: Node, batch: &mut GraphBatch) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            // Keyword tokens share their kind string with the constructs
            // they introduce ("struct", "function"); only named nodes are
            // declarations.
            if !child.is_named() {
                continue;
            }

            let kind = child.kind();
            let mapped = if kind.contains("function") || kind.contains("method") {
                Some(NodeKind::Function)
            } else if kind.contains("class") || kind.contains("struct") {
                Some(NodeKind::Class)
            } else {
                None
            };

            if let Some(node_kind) = mapped {
                if let Some(name) = Self::name_field(ctx.source, child) {
                    let code_node = self.new_node(ctx, node_kind, &name, child);
                    batch.push_edge(CodeEdge::new(
                        ctx.file_id,
                        &code_node.id,
                        EdgeKind::Contains,
                    ));
                    batch.push_node(code_node);
                }
            }

            self.visit_generic(ctx, child, batch);
        }
    }

    // --- Shared helpers ---

    fn new_node(&self, ctx: &FileContext, kind: NodeKind, name: &str, node: Node) -> CodeNode {
        let start_line = node.start_position().row + 1;
        let end_line = node.end_position().row + 1;
        CodeNode::new(kind, name, ctx.file_path, start_line, end_line)
            .content(preview(Self::node_text(ctx.source, node)))
    }

    fn node_text<'s>(source: &'s str, node: Node) -> &'s str {
        source.get(node.byte_range()).unwrap_or_default()
    }

    fn name_field(source: &str, node: Node) -> Option<String> {
        node.child_by_field_name("name")
            .map(|n| Self::node_text(source, n).to_string())
    }

    /// Name of the variable an anonymous function is assigned to
    fn binding_name(source: &str, node: Node) -> Option<String> {
        let parent = node.parent()?;
        if parent.kind() != "variable_declarator" {
            return None;
        }
        parent
            .child_by_field_name("name")
            .map(|n| Self::node_text(source, n).to_string())
    }

    fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
        let mut cursor = node.walk();
        let found = node.children(&mut cursor).find(|child| child.kind() == kind);
        found
    }

    fn has_token(node: Node, token: &str) -> bool {
        let mut cursor = node.walk();
        let found = node.children(&mut cursor).any(|child| child.kind() == token);
        found
    }

    fn is_private_member(source: &str, node: Node, name: &str) -> bool {
        if name.starts_with('#') {
            return true;
        }
        let mut cursor = node.walk();
        let found = node.children(&mut cursor).any(|child| {
            child.kind() == "accessibility_modifier" && Self::node_text(source, child) == "private"
        });
        found
    }
}

/// Truncate to the preview limit without splitting a UTF-8 character
fn preview(text: &str) -> String {
    if text.len() <= CONTENT_PREVIEW_LIMIT {
        return text.to_string();
    }
    let mut end = CONTENT_PREVIEW_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}
