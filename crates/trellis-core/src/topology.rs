//! Structural diagnostics over the edge set using petgraph::StableDiGraph
//!
//! The relationship index tolerates cycles and nodes with several parents; this module
//! reports them so tooling can warn about graphs the layout engine did not produce.

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::Dfs;
use petgraph::Direction;

use crate::model::{CanvasGraph, NodeId};

/// Directed parent -> child graph over one snapshot.
pub struct Topology {
    inner: StableDiGraph<NodeId, ()>,
    index: HashMap<NodeId, NodeIndex>,
}

impl std::fmt::Debug for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topology")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl Topology {
    /// Edges whose endpoints are not both present are skipped.
    pub fn from_graph(graph: &CanvasGraph) -> Self {
        let mut inner = StableDiGraph::with_capacity(graph.nodes.len(), graph.edges.len());
        let mut index = HashMap::with_capacity(graph.nodes.len());

        for node in &graph.nodes {
            let idx = inner.add_node(node.id.clone());
            index.insert(node.id.clone(), idx);
        }

        for edge in &graph.edges {
            if let (Some(&from), Some(&to)) = (index.get(&edge.from_node), index.get(&edge.to_node)) {
                inner.add_edge(from, to, ());
            }
        }

        Topology { inner, index }
    }

    /// Groups of nodes that reach each other, plus self loops. Each group is sorted,
    /// groups are sorted by their first member.
    pub fn cycles(&self) -> Vec<Vec<NodeId>> {
        let mut cycles: Vec<Vec<NodeId>> = tarjan_scc(&self.inner)
            .into_iter()
            .filter(|component| match component.as_slice() {
                [single] => self.inner.contains_edge(*single, *single),
                _ => true,
            })
            .map(|component| {
                let mut ids: Vec<NodeId> = component
                    .into_iter()
                    .filter_map(|idx| self.inner.node_weight(idx).cloned())
                    .collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Nodes with more than one distinct parent, sorted.
    pub fn multi_parent_nodes(&self) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .inner
            .node_indices()
            .filter(|&idx| {
                let parents: HashSet<NodeIndex> =
                    self.inner.neighbors_directed(idx, Direction::Incoming).collect();
                parents.len() > 1
            })
            .filter_map(|idx| self.inner.node_weight(idx).cloned())
            .collect();
        out.sort();
        out
    }

    /// Every node reachable from `id`, excluding `id` itself unless it sits on a cycle.
    pub fn descendants(&self, id: &NodeId) -> BTreeSet<NodeId> {
        let Some(&start) = self.index.get(id) else {
            return BTreeSet::new();
        };

        let mut reached = BTreeSet::new();
        for child in self.inner.neighbors_directed(start, Direction::Outgoing) {
            let mut dfs = Dfs::new(&self.inner, child);
            while let Some(idx) = dfs.next(&self.inner) {
                if let Some(node) = self.inner.node_weight(idx) {
                    reached.insert(node.clone());
                }
            }
        }
        reached
    }

    pub fn is_forest(&self) -> bool {
        self.cycles().is_empty() && self.multi_parent_nodes().is_empty()
    }
}
