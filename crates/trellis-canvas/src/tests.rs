//! Unit tests for trellis-canvas

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use trellis_core::{CanvasEdge, CanvasGraph, CanvasNode, LayoutConfig, NodeId, Point, ValidationError};

use crate::*;

const CANVAS: &str = "boards/plan.canvas";

fn node(id: &str, x: f64, y: f64, width: f64, height: f64) -> CanvasNode {
    CanvasNode::text(id, id, x, y, width, height)
}

fn link(from: &str, to: &str) -> CanvasEdge {
    CanvasEdge::structural(format!("edge-{from}-{to}"), NodeId::from(from), NodeId::from(to))
}

/// Parent `p` at (0, 0, 400x400) with children `c1` at y=100 and `c2` at y=260, plus an
/// unrelated root `r` far away.
fn family() -> CanvasGraph {
    CanvasGraph::with_parts(
        vec![
            node("p", 0.0, 0.0, 400.0, 400.0),
            node("c1", 500.0, 100.0, 250.0, 60.0),
            node("c2", 500.0, 260.0, 250.0, 60.0),
            node("r", -2000.0, 50.0, 250.0, 60.0),
        ],
        vec![link("p", "c1"), link("p", "c2")],
    )
}

fn memory_store(graph: &CanvasGraph) -> Arc<MemoryDocumentStore> {
    let store = Arc::new(MemoryDocumentStore::new());
    store.insert(CANVAS, graph.to_json().unwrap());
    store
}

fn new_coordinator(store: Arc<dyn DocumentStore>) -> GraphMutationCoordinator {
    GraphMutationCoordinator::with_id_source(
        store,
        LayoutConfig::default(),
        Box::new(SequentialIds::new("n")),
    )
}

fn persisted(store: &MemoryDocumentStore) -> CanvasGraph {
    CanvasGraph::from_json(&store.get(CANVAS).unwrap()).unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
}

/// Memory store whose first `failures` writes fail with an I/O error.
struct FlakyStore {
    inner: MemoryDocumentStore,
    failures: AtomicUsize,
}

impl FlakyStore {
    fn new(inner: MemoryDocumentStore, failures: usize) -> Self {
        FlakyStore {
            inner,
            failures: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn resolve_handle(&self, path: &str) -> Option<DocumentHandle> {
        self.inner.resolve_handle(path).await
    }

    async fn read(&self, handle: &DocumentHandle) -> Result<String, StoreError> {
        self.inner.read(handle).await
    }

    async fn write(&self, handle: &DocumentHandle, contents: &str) -> Result<(), StoreError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Io {
                path: handle.to_string(),
                source: std::io::Error::other("disk unavailable"),
            });
        }
        self.inner.write(handle, contents).await
    }
}

/// Hands out a fixed script of ids, then falls back to a counter.
struct ScriptedIds {
    script: Vec<&'static str>,
    cursor: AtomicUsize,
}

impl IdSource for ScriptedIds {
    fn next_id(&self) -> String {
        let i = self.cursor.fetch_add(1, Ordering::SeqCst);
        match self.script.get(i) {
            Some(id) => id.to_string(),
            None => format!("generated{i}"),
        }
    }
}

// ---------------------------------------------------------------------------
// stores
// ---------------------------------------------------------------------------

#[test]
fn test_normalize_key() {
    assert_eq!(store::normalize_key("./a/b.canvas").as_deref(), Some("a/b.canvas"));
    assert_eq!(store::normalize_key("/a//b.canvas").as_deref(), Some("a/b.canvas"));
    assert_eq!(store::normalize_key("../secret.canvas"), None);
    assert_eq!(store::normalize_key(""), None);
}

#[tokio::test]
async fn test_memory_store_resolves_only_existing_documents() {
    let store = MemoryDocumentStore::new();
    store.insert("a.canvas", "{}");

    assert!(store.resolve_handle("./a.canvas").await.is_some());
    assert!(store.resolve_handle("b.canvas").await.is_none());

    let handle = store.resolve_handle("a.canvas").await.unwrap();
    store.write(&handle, "{\"nodes\": []}").await.unwrap();
    assert_eq!(store.read(&handle).await.unwrap(), "{\"nodes\": []}");
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_fs_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("boards")).unwrap();
    std::fs::write(dir.path().join(CANVAS), family().to_json().unwrap()).unwrap();

    let store = FsDocumentStore::new(dir.path());
    assert!(store.resolve_handle("boards/missing.canvas").await.is_none());
    assert!(store.resolve_handle("boards").await.is_none());

    let handle = store.resolve_handle(CANVAS).await.unwrap();
    let text = store.read(&handle).await.unwrap();
    assert_eq!(CanvasGraph::from_json(&text).unwrap(), family());

    store.write(&handle, "{\"nodes\": [], \"edges\": []}").await.unwrap();
    let written = std::fs::read_to_string(dir.path().join(CANVAS)).unwrap();
    assert_eq!(written, "{\"nodes\": [], \"edges\": []}");
}

#[tokio::test]
async fn test_fs_store_write_leaves_no_staging_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("board.canvas"), "{}").unwrap();
    let store = FsDocumentStore::new(dir.path());
    let handle = store.resolve_handle("board.canvas").await.unwrap();

    store.write(&handle, "{\"nodes\": [], \"edges\": []}").await.unwrap();
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["board.canvas"]);
}

#[tokio::test]
async fn test_fs_store_failed_write_keeps_old_contents() {
    let dir = tempfile::tempdir().unwrap();
    let document = dir.path().join("board.canvas");
    std::fs::write(&document, "old").unwrap();
    // a directory squatting on the staging path makes the write fail
    std::fs::create_dir(crate::store::staging_path(&document)).unwrap();

    let store = FsDocumentStore::new(dir.path());
    let handle = store.resolve_handle("board.canvas").await.unwrap();
    assert!(matches!(store.write(&handle, "new").await, Err(StoreError::Io { .. })));
    assert_eq!(std::fs::read_to_string(&document).unwrap(), "old");
}

#[tokio::test]
async fn test_fs_store_read_of_deleted_document() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("gone.canvas"), "{}").unwrap();
    let store = FsDocumentStore::new(dir.path());
    let handle = store.resolve_handle("gone.canvas").await.unwrap();

    std::fs::remove_file(dir.path().join("gone.canvas")).unwrap();
    assert!(matches!(store.read(&handle).await, Err(StoreError::NotFound(_))));
}

#[test]
fn test_random_ids() {
    let ids = RandomIds;
    let a = ids.next_id();
    let b = ids.next_id();
    assert_eq!(a.len(), 16);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);
}

// ---------------------------------------------------------------------------
// insert child
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_first_child_is_centered() {
    let graph = CanvasGraph::with_parts(vec![node("p", 0.0, 0.0, 400.0, 400.0)], Vec::new());
    let store = memory_store(&graph);
    let coord = new_coordinator(store.clone());

    let outcome = coord.insert_child(CANVAS, "p", Point::default()).await.unwrap();
    assert_eq!(outcome.mode, InsertMode::Relayout);
    assert_eq!(outcome.node_id.as_str(), "n1");
    assert_eq!(outcome.edge_id.as_ref().unwrap().as_str(), "edge-p-n1");
    assert!(outcome.repositioned.is_empty());

    let saved = persisted(&store);
    let child = saved.node("n1").unwrap();
    assert_close(child.x, 500.0);
    assert_close(child.y, 170.0);
    assert_eq!(child.width, 250.0);
    assert_eq!(child.height, 60.0);
    assert_eq!(child.content.text(), Some(coordinator::NEW_CHILD_TEXT));

    let edge = saved.edges.iter().find(|e| e.id.as_str() == "edge-p-n1").unwrap();
    assert_eq!(edge.from_node.as_str(), "p");
    assert_eq!(edge.to_node.as_str(), "n1");
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_insert_child_reflows_existing_children() {
    let store = memory_store(&family());
    let coord = new_coordinator(store.clone());

    let outcome = coord.insert_child(CANVAS, "p", Point::default()).await.unwrap();
    assert_eq!(outcome.repositioned, vec![NodeId::from("c1"), NodeId::from("c2")]);

    let saved = persisted(&store);
    assert_close(saved.node("c1").unwrap().y, 90.0);
    assert_close(saved.node("c2").unwrap().y, 170.0);
    assert_close(saved.node("n1").unwrap().y, 250.0);

    // unrelated nodes are untouched
    assert_eq!(saved.node("r"), family().node("r"));

    assert_eq!(outcome.diff.added_nodes, vec![NodeId::from("n1")]);
    assert_eq!(outcome.diff.moved_nodes.len(), 2);
    assert_close(outcome.diff.moved("c1").unwrap().from.y, 100.0);
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_children_stay_centered_on_parent() {
    let store = memory_store(&family());
    let coord = new_coordinator(store.clone());

    for _ in 0..4 {
        coord.insert_child(CANVAS, "p", Point::default()).await.unwrap();
    }

    let saved = persisted(&store);
    let children = coord.children_of(CANVAS, "p").await.unwrap();
    assert_eq!(children.len(), 6);
    let average = children.iter().map(|c| c.center_y()).sum::<f64>() / children.len() as f64;
    assert_close(average, saved.node("p").unwrap().center_y());
}

#[tokio::test]
async fn test_insert_child_regenerates_colliding_node_id() {
    let store = memory_store(&family());
    let ids = ScriptedIds {
        script: vec!["c1", "c2", "fresh"],
        cursor: AtomicUsize::new(0),
    };
    let coord = GraphMutationCoordinator::with_id_source(store.clone(), LayoutConfig::default(), Box::new(ids));

    let outcome = coord.insert_child(CANVAS, "p", Point::default()).await.unwrap();
    assert_eq!(outcome.node_id.as_str(), "fresh");
    assert_eq!(persisted(&store).node_count(), 5);
}

#[tokio::test]
async fn test_insert_child_avoids_colliding_edge_id() {
    let mut graph = family();
    graph.edges.push(CanvasEdge::structural(
        "edge-p-n1",
        NodeId::from("r"),
        NodeId::from("c1"),
    ));
    let store = memory_store(&graph);
    let coord = new_coordinator(store.clone());

    let outcome = coord.insert_child(CANVAS, "p", Point::default()).await.unwrap();
    let edge_id = outcome.edge_id.unwrap();
    assert_ne!(edge_id.as_str(), "edge-p-n1");
    assert!(edge_id.as_str().starts_with("edge-p-n1-"));
}

#[tokio::test]
async fn test_insert_child_unknown_parent_aborts() {
    let store = memory_store(&family());
    let coord = new_coordinator(store.clone());

    let err = coord
        .insert_child(CANVAS, "ghost", Point::new(1.0, 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::NodeNotFound(ref id) if id.as_str() == "ghost"));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_unknown_document() {
    let store = memory_store(&family());
    let coord = new_coordinator(store);

    let err = coord
        .insert_child("other.canvas", "p", Point::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::DocumentNotFound(_)));
}

#[tokio::test]
async fn test_invalid_document_aborts_without_fallback() {
    let store = Arc::new(MemoryDocumentStore::new());
    store.insert(
        CANVAS,
        r#"{"nodes": [{"id": "p", "type": "text", "text": "", "x": 0, "y": 0, "width": 10, "height": 10},
                      {"id": "p", "type": "text", "text": "", "x": 0, "y": 0, "width": 10, "height": 10}],
            "edges": []}"#,
    );
    let coord = new_coordinator(store.clone());

    let err = coord.insert_child(CANVAS, "p", Point::default()).await.unwrap_err();
    assert!(matches!(err, MutationError::Validation(ValidationError::DuplicateNodeId(_))));
    assert!(!err.is_transient());
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_write_failure_falls_back_to_given_position() {
    let inner = MemoryDocumentStore::new();
    inner.insert(CANVAS, family().to_json().unwrap());
    let store = Arc::new(FlakyStore::new(inner, 1));
    let coord = new_coordinator(store.clone());

    let outcome = coord
        .insert_child(CANVAS, "p", Point::new(900.0, 900.0))
        .await
        .unwrap();
    assert_eq!(outcome.mode, InsertMode::Fallback);
    assert!(outcome.repositioned.is_empty());
    assert!(outcome.diff.moved_nodes.is_empty());

    let saved = CanvasGraph::from_json(&store.inner.get(CANVAS).unwrap()).unwrap();
    let child = saved.node(outcome.node_id.as_str()).unwrap();
    assert_eq!(child.position(), Point::new(900.0, 900.0));
    assert_eq!(saved.node("c1"), family().node("c1"));
    assert!(saved.contains_edge(outcome.edge_id.unwrap().as_str()));
}

#[tokio::test]
async fn test_persistent_write_failure_propagates() {
    let inner = MemoryDocumentStore::new();
    inner.insert(CANVAS, family().to_json().unwrap());
    let store = Arc::new(FlakyStore::new(inner, 2));
    let coord = new_coordinator(store.clone());

    let err = coord.insert_child(CANVAS, "p", Point::default()).await.unwrap_err();
    assert!(matches!(err, MutationError::Store(StoreError::Io { .. })));
    assert!(err.is_transient());
}

// ---------------------------------------------------------------------------
// insert sibling / independent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sibling_of_child_goes_under_parent() {
    let store = memory_store(&family());
    let coord = new_coordinator(store.clone());

    let outcome = coord.insert_sibling(CANVAS, "c1", Point::default()).await.unwrap();
    assert_eq!(outcome.mode, InsertMode::Relayout);

    let parent = coord.parent_of(CANVAS, outcome.node_id.as_str()).await.unwrap().unwrap();
    assert_eq!(parent.id.as_str(), "p");

    let siblings = coord.siblings_of(CANVAS, "c1").await.unwrap();
    let ids: Vec<&str> = siblings.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["c2", "n1"]);
}

#[tokio::test]
async fn test_sibling_of_root_is_placed_below_without_edge() {
    let store = memory_store(&family());
    let coord = new_coordinator(store.clone());

    let outcome = coord.insert_sibling(CANVAS, "r", Point::default()).await.unwrap();
    assert_eq!(outcome.mode, InsertMode::Independent);
    assert!(outcome.edge_id.is_none());

    let saved = persisted(&store);
    let created = saved.node(outcome.node_id.as_str()).unwrap();
    let root = saved.node("r").unwrap();
    assert_close(created.x - root.x, 0.0);
    assert_close(created.y - root.y, root.height + 70.0);
    assert_eq!(saved.edge_count(), family().edge_count());
    assert_eq!(created.content.text(), Some(coordinator::NEW_INDEPENDENT_TEXT));
}

#[tokio::test]
async fn test_sibling_of_unknown_node() {
    let store = memory_store(&family());
    let coord = new_coordinator(store.clone());

    let err = coord.insert_sibling(CANVAS, "ghost", Point::default()).await.unwrap_err();
    assert!(matches!(err, MutationError::NodeNotFound(_)));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_insert_independent() {
    let store = memory_store(&family());
    let coord = new_coordinator(store.clone());

    let outcome = coord.insert_independent(CANVAS, Point::new(-50.0, 75.0)).await.unwrap();
    assert_eq!(outcome.mode, InsertMode::Independent);
    assert_eq!(outcome.diff.added_nodes, vec![outcome.node_id.clone()]);
    assert!(outcome.diff.added_edges.is_empty());

    let tree = coord.hierarchy(CANVAS).await.unwrap();
    assert!(tree.roots.contains(&outcome.node_id));
}

// ---------------------------------------------------------------------------
// position updates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_batch_update_partial_success() {
    let store = memory_store(&family());
    let coord = new_coordinator(store.clone());

    let report = coord
        .batch_update_positions(
            CANVAS,
            &[
                PositionUpdate::new("c1", 10.0, 20.0),
                PositionUpdate::new("missing", 0.0, 0.0),
                PositionUpdate::new("c2", 30.0, 40.0),
            ],
        )
        .await
        .unwrap();

    assert!(!report.success);
    assert_eq!(report.updated_nodes.len(), 2);
    assert_eq!(report.failed_nodes, vec![NodeId::from("missing")]);

    let saved = persisted(&store);
    assert_eq!(saved.node("c1").unwrap().position(), Point::new(10.0, 20.0));
    assert_eq!(saved.node("c2").unwrap().position(), Point::new(30.0, 40.0));
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_batch_update_with_no_matches_does_not_write() {
    let store = memory_store(&family());
    let coord = new_coordinator(store.clone());

    let report = coord
        .batch_update_positions(CANVAS, &[PositionUpdate::new("missing", 0.0, 0.0)])
        .await
        .unwrap();
    assert!(!report.success);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_update_node_position() {
    let store = memory_store(&family());
    let coord = new_coordinator(store.clone());

    assert!(coord.update_node_position(CANVAS, "r", 1.0, 2.0).await.unwrap());
    assert!(!coord.update_node_position(CANVAS, "nope", 1.0, 2.0).await.unwrap());
    assert_eq!(persisted(&store).node("r").unwrap().position(), Point::new(1.0, 2.0));
}

#[tokio::test]
async fn test_batch_update_preserves_extra_fields() {
    let mut graph = family();
    graph
        .node_mut("c1")
        .unwrap()
        .extra
        .insert("color".to_string(), serde_json::json!("2"));
    let store = memory_store(&graph);
    let coord = new_coordinator(store.clone());

    coord.update_node_position(CANVAS, "c1", 5.0, 5.0).await.unwrap();
    let saved = persisted(&store);
    assert_eq!(saved.node("c1").unwrap().extra.get("color"), Some(&serde_json::json!("2")));
}

// ---------------------------------------------------------------------------
// input validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_non_finite_position_update_is_rejected() {
    let store = memory_store(&family());
    let coord = new_coordinator(store.clone());

    let err = coord
        .batch_update_positions(
            CANVAS,
            &[
                PositionUpdate::new("c2", 30.0, 40.0),
                PositionUpdate::new("c1", f64::NAN, 0.0),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MutationError::Validation(ValidationError::NonFiniteCoordinate { ref id }) if id.as_str() == "c1"
    ));
    assert_eq!(store.write_count(), 0);

    let graph = coord.snapshot(CANVAS).await.unwrap();
    assert_eq!(graph.node("c2").unwrap().position(), Point::new(500.0, 260.0));
}

#[tokio::test]
async fn test_update_node_position_rejects_infinity() {
    let store = memory_store(&family());
    let coord = new_coordinator(store.clone());

    let err = coord
        .update_node_position(CANVAS, "r", f64::INFINITY, 0.0)
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::Validation(_)));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_non_finite_insert_points_are_rejected() {
    let store = memory_store(&family());
    let coord = new_coordinator(store.clone());

    let err = coord
        .insert_independent(CANVAS, Point::new(f64::NAN, 0.0))
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::Validation(ValidationError::NonFinitePoint { .. })));

    let err = coord
        .insert_child(CANVAS, "p", Point::new(0.0, f64::NEG_INFINITY))
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::Validation(ValidationError::NonFinitePoint { .. })));

    let err = coord
        .insert_sibling(CANVAS, "c1", Point::new(f64::INFINITY, 0.0))
        .await
        .unwrap_err();
    assert!(!err.is_transient());

    assert_eq!(store.write_count(), 0);
    assert_eq!(persisted(&store), family());
}

#[tokio::test]
async fn test_invalid_layout_config_is_refused() {
    let store = memory_store(&family());
    let mut coord = new_coordinator(store.clone());

    let err = coord
        .set_layout_config(LayoutConfig {
            default_node_height: 0.0,
            ..LayoutConfig::default()
        })
        .unwrap_err();
    assert!(matches!(
        err,
        MutationError::Validation(ValidationError::InvalidLayoutConfig { field: "default_node_height", .. })
    ));
    assert_eq!(coord.layout_config(), &LayoutConfig::default());
}

#[tokio::test]
async fn test_mutations_with_invalid_config_never_write() {
    let store = memory_store(&family());
    let coord = GraphMutationCoordinator::with_id_source(
        store.clone(),
        LayoutConfig {
            default_node_height: 0.0,
            ..LayoutConfig::default()
        },
        Box::new(SequentialIds::new("n")),
    );

    let err = coord.insert_child(CANVAS, "p", Point::default()).await.unwrap_err();
    assert!(matches!(err, MutationError::Validation(ValidationError::InvalidLayoutConfig { .. })));
    let err = coord.insert_sibling(CANVAS, "r", Point::default()).await.unwrap_err();
    assert!(matches!(err, MutationError::Validation(_)));
    let err = coord.insert_independent(CANVAS, Point::default()).await.unwrap_err();
    assert!(matches!(err, MutationError::Validation(_)));

    assert_eq!(store.write_count(), 0);
    assert_eq!(coord.snapshot(CANVAS).await.unwrap(), family());
}

#[tokio::test]
async fn test_duplicate_edges_reflow_every_entry() {
    let mut graph = family();
    graph.edges.push(CanvasEdge::structural(
        "again",
        NodeId::from("p"),
        NodeId::from("c1"),
    ));
    let store = memory_store(&graph);
    let coord = new_coordinator(store);

    let children = coord.children_of(CANVAS, "p").await.unwrap();
    let ids: Vec<&str> = children.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2", "c1"]);

    let outcome = coord.insert_child(CANVAS, "p", Point::default()).await.unwrap();
    assert_eq!(outcome.repositioned.len(), 3);
    // slots at y = 50, 130, 210, 290; c1 keeps the later of its two
    let saved = coord.snapshot(CANVAS).await.unwrap();
    assert_close(saved.node("c1").unwrap().y, 210.0);
    assert_close(saved.node("c2").unwrap().y, 130.0);
    assert_close(saved.node(outcome.node_id.as_str()).unwrap().y, 290.0);
}

// ---------------------------------------------------------------------------
// queries and preview
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_preview_does_not_write() {
    let store = memory_store(&family());
    let coord = new_coordinator(store.clone());

    let result = coord.preview_child_layout(CANVAS, "p").await.unwrap();
    assert_eq!(result.positions.len(), 3);
    // existing children are not obstacles for their own column
    assert!(result.positions.iter().all(|p| !p.avoidance_applied));
    assert!(result.warnings.is_empty());
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_preview_avoids_unrelated_nodes() {
    let mut graph = family();
    graph.nodes.push(node("blocker", 500.0, 150.0, 250.0, 60.0));
    let store = memory_store(&graph);
    let coord = new_coordinator(store);

    let result = coord.preview_child_layout(CANVAS, "p").await.unwrap();
    assert!(result.positions.iter().any(|p| p.avoidance_applied));
    assert!(!result.warnings.is_empty());
}

#[tokio::test]
async fn test_layout_config_is_applied() {
    let graph = CanvasGraph::with_parts(vec![node("p", 0.0, 0.0, 400.0, 400.0)], Vec::new());
    let store = memory_store(&graph);
    let mut coord = new_coordinator(store.clone());
    coord.set_layout_config(LayoutConfig {
        horizontal_spacing: 40.0,
        default_node_height: 100.0,
        ..LayoutConfig::default()
    })
    .unwrap();

    let outcome = coord.insert_child(CANVAS, "p", Point::default()).await.unwrap();
    let saved = persisted(&store);
    let child = saved.node(outcome.node_id.as_str()).unwrap();
    assert_close(child.x, 440.0);
    assert_close(child.y, 150.0);
    assert_eq!(child.height, 100.0);
}

// ---------------------------------------------------------------------------
// concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_inserts_are_serialized() {
    let graph = CanvasGraph::with_parts(vec![node("p", 0.0, 0.0, 400.0, 400.0)], Vec::new());
    let store = memory_store(&graph);
    let coord = Arc::new(GraphMutationCoordinator::new(store.clone(), LayoutConfig::default()));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let coord = coord.clone();
            tokio::spawn(async move { coord.insert_child(CANVAS, "p", Point::default()).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let saved = persisted(&store);
    assert_eq!(saved.node_count(), 9);
    assert_eq!(saved.edge_count(), 8);
    assert_eq!(store.write_count(), 8);
    assert_eq!(coord.locked_documents(), 0);
}

#[tokio::test]
async fn test_document_locks_are_released() {
    let store = memory_store(&family());
    let coord = new_coordinator(store.clone());

    coord.insert_child(CANVAS, "p", Point::default()).await.unwrap();
    coord.update_node_position(CANVAS, "r", 0.0, 0.0).await.unwrap();
    let _ = coord.insert_child(CANVAS, "ghost", Point::default()).await;
    assert_eq!(coord.locked_documents(), 0);

    let coord = Arc::new(coord);
    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let coord = coord.clone();
            tokio::spawn(async move { coord.update_node_position(CANVAS, "r", i as f64, 0.0).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert_eq!(coord.locked_documents(), 0);
}
