use std::sync::Arc;

use codegraph_extractor::{Language, RelationshipExtractor};
use codegraph_model::{CodeEdge, CodeNode, EdgeKind, NodeKind};
use codegraph_search::{ContextSearch, Embedder, HashingEmbedder, SearchOptions};
use codegraph_store::{GraphStore, GraphStoreConfig, InMemoryPointStore};

const DIM: usize = 8;

async fn service() -> ContextSearch {
    let backend = Arc::new(InMemoryPointStore::new());
    let config = GraphStoreConfig::new("/workspaces/search-demo").vector_size(DIM);
    let store = GraphStore::new(backend, config).expect("store");
    store.initialize().await.expect("initialize");
    ContextSearch::new(store, Arc::new(HashingEmbedder::new(DIM)))
}

async fn embed(text: &str) -> Vec<f32> {
    HashingEmbedder::new(DIM)
        .create_embeddings(&[text.to_string()])
        .await
        .expect("embed")
        .remove(0)
}

async fn embedded_function(name: &str, file: &str, content: &str) -> CodeNode {
    CodeNode::new(NodeKind::Function, name, file, 1, 5)
        .content(content)
        .embedding(embed(content).await)
}

#[tokio::test]
async fn search_ranks_exact_content_first_within_limit() {
    let search = service().await;
    let mut nodes = Vec::new();
    for (name, content) in [
        ("parse", "fn parse(input: &str) -> Ast"),
        ("render", "fn render(doc: &Doc) -> String"),
        ("fetch", "async fn fetch(url: &str) -> Bytes"),
        ("walk", "fn walk(dir: &Path) -> Vec<PathBuf>"),
    ] {
        nodes.push(embedded_function(name, "src/lib.rs", content).await);
    }
    search.store().add_nodes(&nodes).await.expect("seed");

    let options = SearchOptions::default().limit(3);
    let results = search
        .search_with_context("fn render(doc: &Doc) -> String", &options)
        .await
        .expect("search");

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].node.name, "render");
    assert!(results[0].score > 0.99, "exact content scores ~1.0");
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score, "scores never increase");
    }
}

#[tokio::test]
async fn search_ignores_blank_queries() {
    let search = service().await;
    let options = SearchOptions::default();
    assert!(search.search_with_context("", &options).await.expect("empty").is_empty());
    assert!(search.search_with_context("   ", &options).await.expect("blank").is_empty());
}

#[tokio::test]
async fn search_narrows_candidates_to_first_node_kind() {
    let search = service().await;
    let content = "Alpha shared body";
    let class = CodeNode::new(NodeKind::Class, "Alpha", "src/a.ts", 1, 10)
        .content(content)
        .embedding(embed(content).await);
    let function = CodeNode::new(NodeKind::Function, "Alpha", "src/a.ts", 12, 20)
        .content(content)
        .embedding(embed(content).await);
    search.store().add_nodes(&[class, function]).await.expect("seed");

    let options = SearchOptions::default().node_kind(NodeKind::Function);
    let results = search.search_with_context(content, &options).await.expect("search");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].node.kind, NodeKind::Function);
}

#[tokio::test]
async fn search_can_skip_context_assembly() {
    let search = service().await;
    let node = embedded_function("lonely", "src/lonely.rs", "fn lonely() {}").await;
    search.store().add_node(&node).await.expect("seed");

    let plain = search
        .search_with_context("fn lonely() {}", &SearchOptions::default().without_related())
        .await
        .expect("plain");
    assert!(plain[0].context.is_none());

    let enriched = search
        .search_with_context("fn lonely() {}", &SearchOptions::default())
        .await
        .expect("enriched");
    assert!(enriched[0].context.is_some());
}

#[tokio::test]
async fn search_context_bundles_the_neighborhood() {
    let search = service().await;
    let file = CodeNode::new(NodeKind::File, "app.ts", "src/app.ts", 1, 40);
    let content = "class Widget { render() {} }";
    let class = CodeNode::new(NodeKind::Class, "Widget", "src/app.ts", 5, 30)
        .content(content)
        .embedding(embed(content).await);
    let method = CodeNode::new(NodeKind::Method, "render", "src/app.ts", 10, 20);
    search
        .store()
        .add_nodes(&[file.clone(), class.clone(), method.clone()])
        .await
        .expect("nodes");
    search
        .store()
        .add_edges(&[
            CodeEdge::new(&file.id, &class.id, EdgeKind::Contains),
            CodeEdge::new(&class.id, &method.id, EdgeKind::Contains),
        ])
        .await
        .expect("edges");

    let results = search
        .search_with_context(content, &SearchOptions::default())
        .await
        .expect("search");
    let hit = results
        .iter()
        .find(|r| r.node.id == class.id)
        .expect("class in results");
    let context = hit.context.as_ref().expect("context");

    let related: Vec<&str> = context.related_nodes.iter().map(|n| n.name.as_str()).collect();
    assert!(related.contains(&"app.ts"));
    assert!(related.contains(&"render"));
    assert_eq!(context.relationships.len(), 2);
    assert!(context.call_chain.is_empty(), "classes have no call chain");
    assert!(context.dependencies.is_empty());
}

#[tokio::test]
async fn call_chain_walks_callers_transitively() {
    let search = service().await;
    let inner = embedded_function("inner", "src/a.rs", "fn inner() {}").await;
    let middle = CodeNode::new(NodeKind::Function, "middle", "src/b.rs", 1, 5);
    let outer = CodeNode::new(NodeKind::Function, "outer", "src/c.rs", 1, 5);
    let callee = CodeNode::new(NodeKind::Function, "callee", "src/d.rs", 1, 5);
    search
        .store()
        .add_nodes(&[inner.clone(), middle.clone(), outer.clone(), callee.clone()])
        .await
        .expect("nodes");
    search
        .store()
        .add_edges(&[
            CodeEdge::new(&middle.id, &inner.id, EdgeKind::Calls),
            CodeEdge::new(&outer.id, &middle.id, EdgeKind::Calls),
            CodeEdge::new(&inner.id, &callee.id, EdgeKind::Calls),
        ])
        .await
        .expect("edges");

    let results = search
        .search_with_context("fn inner() {}", &SearchOptions::default())
        .await
        .expect("search");
    let hit = results.iter().find(|r| r.node.id == inner.id).expect("inner");
    let chain: Vec<&str> = hit
        .context
        .as_ref()
        .expect("context")
        .call_chain
        .iter()
        .map(|n| n.name.as_str())
        .collect();

    assert_eq!(chain, ["middle", "outer"], "nearest caller first, callees excluded");
}

#[tokio::test]
async fn location_context_follows_dependencies_transitively() {
    let search = service().await;
    let module_a = CodeNode::new(NodeKind::File, "module_a", "a.ts", 1, 10);
    let module_b = CodeNode::new(NodeKind::File, "module_b", "b.ts", 1, 10);
    let module_c = CodeNode::new(NodeKind::File, "module_c", "c.ts", 1, 10);
    let bystander = CodeNode::new(NodeKind::File, "bystander", "x.ts", 1, 10);
    search
        .store()
        .add_nodes(&[
            module_a.clone(),
            module_b.clone(),
            module_c.clone(),
            bystander.clone(),
        ])
        .await
        .expect("nodes");
    search
        .store()
        .add_edges(&[
            CodeEdge::new(&module_a.id, &module_b.id, EdgeKind::Imports),
            CodeEdge::new(&module_b.id, &module_c.id, EdgeKind::DependsOn),
            CodeEdge::new(&module_a.id, &bystander.id, EdgeKind::References),
        ])
        .await
        .expect("edges");

    let hit = search
        .context_for_location("a.ts", 5)
        .await
        .expect("lookup")
        .expect("covered location");
    assert_eq!(hit.node.id, module_a.id);
    assert_eq!(hit.score, 1.0);

    let deps: Vec<&str> = hit
        .context
        .as_ref()
        .expect("context")
        .dependencies
        .iter()
        .map(|n| n.name.as_str())
        .collect();
    assert_eq!(deps, ["module_b", "module_c"], "reference edges are not dependencies");
}

#[tokio::test]
async fn location_lookup_picks_the_tightest_span() {
    let search = service().await;
    let file = CodeNode::new(NodeKind::File, "span.ts", "src/span.ts", 1, 50);
    let class = CodeNode::new(NodeKind::Class, "Outer", "src/span.ts", 5, 30);
    let method = CodeNode::new(NodeKind::Method, "exact", "src/span.ts", 10, 20);
    search
        .store()
        .add_nodes(&[file.clone(), class.clone(), method.clone()])
        .await
        .expect("nodes");

    let inner = search
        .context_for_location("src/span.ts", 12)
        .await
        .expect("lookup")
        .expect("span hit");
    assert_eq!(inner.node.id, method.id);

    let outer = search
        .context_for_location("src/span.ts", 40)
        .await
        .expect("lookup")
        .expect("file-level hit");
    assert_eq!(outer.node.id, file.id);

    assert!(search
        .context_for_location("src/span.ts", 999)
        .await
        .expect("lookup")
        .is_none());
    assert!(search
        .context_for_location("src/other.ts", 12)
        .await
        .expect("lookup")
        .is_none());
}

#[tokio::test]
async fn related_code_ranks_by_declaration_priority() {
    let search = service().await;
    let file = CodeNode::new(NodeKind::File, "shop.ts", "src/shop.ts", 1, 80);
    let class = CodeNode::new(NodeKind::Class, "Shop", "src/shop.ts", 10, 60);
    let method = CodeNode::new(NodeKind::Method, "checkout", "src/shop.ts", 20, 40);
    let constant = CodeNode::new(NodeKind::Constant, "MAX_ITEMS", "src/shop.ts", 3, 3);
    let import = CodeNode::new(NodeKind::Import, "react", "src/shop.ts", 1, 1);
    search
        .store()
        .add_nodes(&[
            file.clone(),
            class.clone(),
            method.clone(),
            constant.clone(),
            import.clone(),
        ])
        .await
        .expect("nodes");
    search
        .store()
        .add_edges(&[
            CodeEdge::new(&file.id, &class.id, EdgeKind::Contains),
            CodeEdge::new(&class.id, &method.id, EdgeKind::Contains),
            CodeEdge::new(&file.id, &constant.id, EdgeKind::Contains),
            CodeEdge::new(&file.id, &import.id, EdgeKind::Imports),
        ])
        .await
        .expect("edges");

    let ranked = search.find_related_code(&file.id, &[]).await.expect("related");
    let names: Vec<&str> = ranked.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, ["Shop", "checkout", "MAX_ITEMS", "react"]);

    let imports_only = search
        .find_related_code(&file.id, &[EdgeKind::Imports])
        .await
        .expect("filtered");
    let names: Vec<&str> = imports_only.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, ["react"]);

    assert!(search
        .find_related_code("no-such-node", &[])
        .await
        .expect("unknown root")
        .is_empty());
}

#[tokio::test]
async fn reads_degrade_when_collections_are_missing() {
    let backend = Arc::new(InMemoryPointStore::new());
    let config = GraphStoreConfig::new("/workspaces/cold").vector_size(DIM);
    let store = GraphStore::new(backend, config).expect("store");
    let search = ContextSearch::new(store, Arc::new(HashingEmbedder::new(DIM)));

    let results = search
        .search_with_context("anything", &SearchOptions::default())
        .await
        .expect("search degrades");
    assert!(results.is_empty());

    assert!(search
        .context_for_location("src/app.ts", 1)
        .await
        .expect("location degrades")
        .is_none());
    assert!(search
        .find_related_code("some-id", &[])
        .await
        .expect("related degrades")
        .is_empty());
}

#[tokio::test]
async fn extracted_files_are_searchable_end_to_end() {
    let search = service().await;
    let code = r"class Cart {
    total(): number {
        return this.items.length;
    }
}
";
    let mut extractor = RelationshipExtractor::new(Language::TypeScript).expect("extractor");
    let batch = extractor.extract(code, "src/cart.ts").expect("extract");

    let mut nodes = Vec::new();
    for node in batch.nodes {
        let vector = embed(&node.content).await;
        nodes.push(node.embedding(vector));
    }
    search.store().add_nodes(&nodes).await.expect("nodes");
    search.store().add_edges(&batch.edges).await.expect("edges");

    let query = nodes
        .iter()
        .find(|n| n.kind == NodeKind::Method)
        .expect("method node")
        .content
        .clone();
    let options = SearchOptions::default().node_kind(NodeKind::Method).limit(5);
    let results = search.search_with_context(&query, &options).await.expect("search");

    assert_eq!(results[0].node.name, "total");
    assert!(results[0].score > 0.99);

    let context = results[0].context.as_ref().expect("context");
    let related: Vec<&str> = context.related_nodes.iter().map(|n| n.name.as_str()).collect();
    assert!(related.contains(&"Cart"), "class arrives via containment: {related:?}");
    assert!(related.contains(&"cart.ts"), "file arrives at depth two: {related:?}");
    assert!(context.call_chain.is_empty());
}
