//! Test fixtures for canvas graphs

use crate::model::{CanvasEdge, CanvasGraph, CanvasNode, NodeId};

/// Text node with the default layout size.
pub fn text_node(id: &str, x: f64, y: f64) -> CanvasNode {
    CanvasNode::text(id, format!("node {id}"), x, y, 250.0, 60.0)
}

pub fn edge(from: &str, to: &str) -> CanvasEdge {
    CanvasEdge::structural(format!("edge-{from}-{to}"), NodeId::from(from), NodeId::from(to))
}

/// Graph from nodes and `(parent, child)` pairs.
pub fn graph(nodes: Vec<CanvasNode>, edges: &[(&str, &str)]) -> CanvasGraph {
    CanvasGraph::with_parts(nodes, edges.iter().map(|(from, to)| edge(from, to)).collect())
}

/// Graph of default-size nodes laid out on a diagonal, one per id.
pub fn graph_of(ids: &[&str], edges: &[(&str, &str)]) -> CanvasGraph {
    let nodes = ids
        .iter()
        .enumerate()
        .map(|(i, id)| text_node(id, i as f64 * 400.0, i as f64 * 100.0))
        .collect();
    graph(nodes, edges)
}

/// root -> (a, b), a -> (a1, a2), b -> b1, plus an unrelated root `lone`.
pub fn sample_tree() -> CanvasGraph {
    graph_of(
        &["root", "a", "b", "a1", "a2", "b1", "lone"],
        &[("root", "a"), ("root", "b"), ("a", "a1"), ("a", "a2"), ("b", "b1")],
    )
}

/// A canvas document as the host writes it, with host-specific extras.
pub const SAMPLE_DOCUMENT: &str = r##"{
	"nodes": [
		{"id": "p", "type": "text", "text": "Parent", "x": 0, "y": 0, "width": 250, "height": 60, "color": "4"},
		{"id": "f", "type": "file", "file": "notes/Idea.md", "x": 400, "y": -200, "width": 400, "height": 400}
	],
	"edges": [
		{"id": "e1", "fromNode": "p", "fromSide": "right", "toNode": "f", "toSide": "left", "label": "expands"}
	],
	"metadata": {"version": "1.0"}
}"##;
