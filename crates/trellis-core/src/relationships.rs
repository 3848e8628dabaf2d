//! Parent/child/sibling inference from structural edges
//!
//! Every edge `from -> to` is read as "`from` is the parent of `to`". The index is built
//! eagerly from one borrowed snapshot and never updated incrementally; build a new
//! analyzer for every pass.
//!
//! Graphs the engine did not produce may have nodes with several parents or cycles.
//! Those are tolerated: the last edge targeting a node decides its parent, and level
//! assignment walks from roots with a visited set, so cycle members that no root reaches
//! keep level 0.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::model::{CanvasGraph, CanvasNode, NodeId};

/// Derived relationship record for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRelationship {
    pub node_id: NodeId,
    pub parent_id: Option<NodeId>,
    /// Children in the order their edges appear, without duplicates.
    pub child_ids: Vec<NodeId>,
    /// Other children of the same parent, in the parent's child order.
    pub sibling_ids: Vec<NodeId>,
    /// Distance from the root the level walk reached this node from.
    pub level: usize,
}

impl NodeRelationship {
    fn new(node_id: NodeId) -> Self {
        NodeRelationship {
            node_id,
            parent_id: None,
            child_ids: Vec::new(),
            sibling_ids: Vec::new(),
            level: 0,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Roots plus the full relationship mapping.
#[derive(Debug, Clone, Serialize)]
pub struct HierarchyTree {
    pub roots: Vec<NodeId>,
    pub relationships: HashMap<NodeId, NodeRelationship>,
}

impl HierarchyTree {
    pub fn get(&self, id: &str) -> Option<&NodeRelationship> {
        self.relationships.get(&NodeId::from(id))
    }

    /// Pre-order walk from every root, yielding `(node, depth)`. Each node appears once.
    pub fn depth_first(&self) -> Vec<(NodeId, usize)> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        for root in &self.roots {
            let mut stack = vec![(root, 0usize)];
            while let Some((id, depth)) = stack.pop() {
                if !visited.insert(id) {
                    continue;
                }
                out.push((id.clone(), depth));
                if let Some(rel) = self.relationships.get(id) {
                    for child in rel.child_ids.iter().rev() {
                        stack.push((child, depth + 1));
                    }
                }
            }
        }
        out
    }

    /// Nodes no root reaches (members of parentless cycles and their subtrees).
    pub fn unreachable(&self) -> Vec<NodeId> {
        let reached: HashSet<NodeId> = self.depth_first().into_iter().map(|(id, _)| id).collect();
        let mut rest: Vec<NodeId> = self
            .relationships
            .keys()
            .filter(|id| !reached.contains(*id))
            .cloned()
            .collect();
        rest.sort();
        rest
    }
}

/// Relationship index over one snapshot.
pub struct RelationshipAnalyzer<'g> {
    graph: &'g CanvasGraph,
    /// Node id -> index into both `graph.nodes` and `relationships`.
    index: HashMap<&'g str, usize>,
    relationships: Vec<NodeRelationship>,
}

impl std::fmt::Debug for RelationshipAnalyzer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipAnalyzer")
            .field("node_count", &self.relationships.len())
            .field("edge_count", &self.graph.edges.len())
            .finish()
    }
}

impl<'g> RelationshipAnalyzer<'g> {
    pub fn new(graph: &'g CanvasGraph) -> Self {
        let index: HashMap<&str, usize> = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.as_str(), i))
            .collect();

        let mut relationships: Vec<NodeRelationship> = graph
            .nodes
            .iter()
            .map(|node| NodeRelationship::new(node.id.clone()))
            .collect();

        for edge in &graph.edges {
            let (Some(&parent), Some(&child)) = (
                index.get(edge.from_node.as_str()),
                index.get(edge.to_node.as_str()),
            ) else {
                continue;
            };
            // repeated edges repeat the child
            relationships[parent].child_ids.push(edge.to_node.clone());
            relationships[child].parent_id = Some(edge.from_node.clone());
        }

        for i in 0..relationships.len() {
            let Some(parent) = relationships[i]
                .parent_id
                .as_ref()
                .and_then(|p| index.get(p.as_str()).copied())
            else {
                continue;
            };
            let own = &relationships[i].node_id;
            let siblings: Vec<NodeId> = relationships[parent]
                .child_ids
                .iter()
                .filter(|id| *id != own)
                .cloned()
                .collect();
            relationships[i].sibling_ids = siblings;
        }

        assign_levels(&mut relationships, &index);

        RelationshipAnalyzer {
            graph,
            index,
            relationships,
        }
    }

    /// Children of `parent_id` in edge order. Empty for unknown or childless nodes.
    pub fn child_nodes(&self, parent_id: &str) -> Vec<&'g CanvasNode> {
        self.relationship(parent_id)
            .map(|rel| self.resolve(&rel.child_ids))
            .unwrap_or_default()
    }

    pub fn parent_node(&self, child_id: &str) -> Option<&'g CanvasNode> {
        let parent = self.relationship(child_id)?.parent_id.as_ref()?;
        self.lookup(parent.as_str())
    }

    /// Other children of the node's parent. Roots have no siblings.
    pub fn sibling_nodes(&self, node_id: &str) -> Vec<&'g CanvasNode> {
        self.relationship(node_id)
            .map(|rel| self.resolve(&rel.sibling_ids))
            .unwrap_or_default()
    }

    pub fn relationship(&self, node_id: &str) -> Option<&NodeRelationship> {
        self.index.get(node_id).map(|&i| &self.relationships[i])
    }

    pub fn relationships(&self) -> &[NodeRelationship] {
        &self.relationships
    }

    pub fn roots(&self) -> impl Iterator<Item = &NodeId> {
        self.relationships
            .iter()
            .filter(|rel| rel.is_root())
            .map(|rel| &rel.node_id)
    }

    pub fn build_hierarchy_tree(&self) -> HierarchyTree {
        HierarchyTree {
            roots: self.roots().cloned().collect(),
            relationships: self
                .relationships
                .iter()
                .map(|rel| (rel.node_id.clone(), rel.clone()))
                .collect(),
        }
    }

    fn lookup(&self, id: &str) -> Option<&'g CanvasNode> {
        self.index.get(id).map(|&i| &self.graph.nodes[i])
    }

    fn resolve(&self, ids: &[NodeId]) -> Vec<&'g CanvasNode> {
        ids.iter().filter_map(|id| self.lookup(id.as_str())).collect()
    }
}

/// Pre-order walk from each root. A node gets the depth of its first visit.
fn assign_levels(relationships: &mut [NodeRelationship], index: &HashMap<&str, usize>) {
    let mut visited: HashSet<usize> = HashSet::with_capacity(relationships.len());

    for root in 0..relationships.len() {
        if !relationships[root].is_root() || visited.contains(&root) {
            continue;
        }
        let mut stack = vec![(root, 0usize)];
        while let Some((current, level)) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            relationships[current].level = level;
            for child in relationships[current].child_ids.iter().rev() {
                if let Some(&c) = index.get(child.as_str()) {
                    stack.push((c, level + 1));
                }
            }
        }
    }
}
