//! Snapshot diff between the document as read and as written

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::model::{CanvasGraph, EdgeId, NodeId, Point};

/// A node whose top-left corner changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMove {
    pub id: NodeId,
    pub from: Point,
    pub to: Point,
}

/// Changes between two snapshots of the same document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SnapshotDiff {
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub moved_nodes: Vec<NodeMove>,
    pub added_edges: Vec<EdgeId>,
    pub removed_edges: Vec<EdgeId>,
}

impl SnapshotDiff {
    /// Compare by id. Output lists follow node/edge order in whichever snapshot holds them.
    pub fn between(old: &CanvasGraph, new: &CanvasGraph) -> Self {
        let old_positions: HashMap<&NodeId, Point> =
            old.nodes.iter().map(|n| (&n.id, n.position())).collect();
        let new_ids: HashSet<&NodeId> = new.nodes.iter().map(|n| &n.id).collect();

        let mut diff = SnapshotDiff::default();

        for node in &new.nodes {
            match old_positions.get(&node.id) {
                None => diff.added_nodes.push(node.id.clone()),
                Some(&from) if from != node.position() => diff.moved_nodes.push(NodeMove {
                    id: node.id.clone(),
                    from,
                    to: node.position(),
                }),
                Some(_) => {}
            }
        }

        diff.removed_nodes = old
            .nodes
            .iter()
            .filter(|n| !new_ids.contains(&n.id))
            .map(|n| n.id.clone())
            .collect();

        diff.added_edges = new
            .edges
            .iter()
            .filter(|e| !old.contains_edge(e.id.as_str()))
            .map(|e| e.id.clone())
            .collect();

        diff.removed_edges = old
            .edges
            .iter()
            .filter(|e| !new.contains_edge(e.id.as_str()))
            .map(|e| e.id.clone())
            .collect();

        diff
    }

    /// Check if this diff is empty (no changes).
    pub fn is_empty(&self) -> bool {
        self.added_nodes.is_empty()
            && self.removed_nodes.is_empty()
            && self.moved_nodes.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty()
    }

    pub fn moved(&self, id: &str) -> Option<&NodeMove> {
        self.moved_nodes.iter().find(|m| m.id.as_str() == id)
    }
}
