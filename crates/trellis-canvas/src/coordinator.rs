//! Read-modify-write orchestration of structural edits
//!
//! Each mutation resolves the document, takes that document's lock, reads and validates
//! one snapshot, applies the edit in memory and writes the snapshot back once. Mutations
//! issued through one coordinator are therefore serialized per document; writers outside
//! the coordinator still race last-writer-wins.
//!
//! Caller input (coordinates, the layout config) is validated before the document is
//! read, so a rejected mutation never touches the store.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use trellis_core::{
    parse_canvas, to_pretty_json, CanvasEdge, CanvasGraph, CanvasNode, EdgeId, HierarchyTree,
    LayoutConfig, LayoutResult, NodeId, Point, RelationshipAnalyzer, SnapshotDiff,
    SymmetricLayoutCalculator, ValidationError,
};

use crate::error::MutationError;
use crate::ids::{IdSource, RandomIds};
use crate::store::{DocumentHandle, DocumentStore};

pub const NEW_CHILD_TEXT: &str = "New child node";
pub const NEW_INDEPENDENT_TEXT: &str = "New independent node";

/// Vertical gap between a root node and a sibling created beneath it.
pub const INDEPENDENT_SIBLING_SPACING: f64 = 70.0;

const MAX_ID_ATTEMPTS: usize = 32;

/// How a node was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InsertMode {
    /// Symmetric re-flow of the parent's children.
    Relayout,
    /// Placed at the caller's fallback point after the re-flow failed.
    Fallback,
    /// Unconnected node.
    Independent,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsertOutcome {
    pub node_id: NodeId,
    pub edge_id: Option<EdgeId>,
    /// Existing children moved by the re-flow.
    pub repositioned: Vec<NodeId>,
    pub mode: InsertMode,
    pub diff: SnapshotDiff,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionUpdate {
    pub node_id: NodeId,
    pub x: f64,
    pub y: f64,
}

impl PositionUpdate {
    pub fn new(node_id: impl Into<NodeId>, x: f64, y: f64) -> Self {
        PositionUpdate {
            node_id: node_id.into(),
            x,
            y,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.x.is_finite() && self.y.is_finite() {
            Ok(())
        } else {
            Err(ValidationError::NonFiniteCoordinate {
                id: self.node_id.clone(),
            })
        }
    }
}

/// Outcome of a batch move. `success` is false when any id was missing; found nodes are
/// still moved and persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchUpdateReport {
    pub success: bool,
    pub updated_nodes: Vec<NodeId>,
    pub failed_nodes: Vec<NodeId>,
}

pub struct GraphMutationCoordinator {
    store: Arc<dyn DocumentStore>,
    config: LayoutConfig,
    ids: Box<dyn IdSource>,
    locks: DashMap<DocumentHandle, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for GraphMutationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphMutationCoordinator")
            .field("config", &self.config)
            .field("open_documents", &self.locks.len())
            .finish()
    }
}

impl GraphMutationCoordinator {
    pub fn new(store: Arc<dyn DocumentStore>, config: LayoutConfig) -> Self {
        Self::with_id_source(store, config, Box::new(RandomIds))
    }

    pub fn with_id_source(
        store: Arc<dyn DocumentStore>,
        config: LayoutConfig,
        ids: Box<dyn IdSource>,
    ) -> Self {
        GraphMutationCoordinator {
            store,
            config,
            ids,
            locks: DashMap::new(),
        }
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Replace the layout config. An invalid config is rejected and the current one kept.
    pub fn set_layout_config(&mut self, config: LayoutConfig) -> Result<(), MutationError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // mutations
    // -----------------------------------------------------------------------

    /// Add a child under `parent_id`, re-flowing all of the parent's children into a
    /// symmetric column. If the document cannot be read, parsed or written, the child is
    /// instead placed at `fallback` with its edge and no siblings move.
    pub async fn insert_child(
        &self,
        path: &str,
        parent_id: &str,
        fallback: Point,
    ) -> Result<InsertOutcome, MutationError> {
        self.config.validate()?;
        fallback.validate()?;
        let handle = self.resolve(path).await?;
        let _guard = self.lock_document(&handle).await;

        let snapshot = self.load(&handle).await;
        self.insert_child_locked(&handle, snapshot, parent_id, fallback)
            .await
    }

    /// Add a sibling of `selected_id`. A node with a parent gets a new child under that
    /// parent; a root gets an unconnected node directly below it.
    pub async fn insert_sibling(
        &self,
        path: &str,
        selected_id: &str,
        fallback: Point,
    ) -> Result<InsertOutcome, MutationError> {
        self.config.validate()?;
        fallback.validate()?;
        let handle = self.resolve(path).await?;
        let _guard = self.lock_document(&handle).await;

        let before = self.load(&handle).await?;
        let analyzer = RelationshipAnalyzer::new(&before);
        let selected = before
            .node(selected_id)
            .ok_or_else(|| MutationError::NodeNotFound(NodeId::from(selected_id)))?;

        if let Some(parent) = analyzer.parent_node(selected_id) {
            let parent_id = parent.id.clone();
            debug!(selected = selected_id, parent = %parent_id, "sibling goes under parent");
            drop(analyzer);
            return self
                .insert_child_locked(&handle, Ok(before), parent_id.as_str(), fallback)
                .await;
        }

        let at = Point::new(
            selected.x,
            selected.y + selected.height + INDEPENDENT_SIBLING_SPACING,
        );
        debug!(selected = selected_id, x = at.x, y = at.y, "root sibling placed below");
        drop(analyzer);
        self.insert_unconnected(&handle, before, at).await
    }

    /// Add an unconnected text node at `at`.
    pub async fn insert_independent(
        &self,
        path: &str,
        at: Point,
    ) -> Result<InsertOutcome, MutationError> {
        self.config.validate()?;
        at.validate()?;
        let handle = self.resolve(path).await?;
        let _guard = self.lock_document(&handle).await;

        let before = self.load(&handle).await?;
        self.insert_unconnected(&handle, before, at).await
    }

    /// Move every listed node that exists, in one write. Missing ids are reported, not
    /// fatal. Nothing is written when no id matched.
    pub async fn batch_update_positions(
        &self,
        path: &str,
        updates: &[PositionUpdate],
    ) -> Result<BatchUpdateReport, MutationError> {
        for update in updates {
            update.validate()?;
        }
        let handle = self.resolve(path).await?;
        let _guard = self.lock_document(&handle).await;

        let mut graph = self.load(&handle).await?;
        let mut report = BatchUpdateReport::default();

        for update in updates {
            match graph.node_mut(update.node_id.as_str()) {
                Some(node) => {
                    node.x = update.x;
                    node.y = update.y;
                    report.updated_nodes.push(update.node_id.clone());
                }
                None => {
                    warn!("Node {} not found for position update", update.node_id);
                    report.failed_nodes.push(update.node_id.clone());
                }
            }
        }

        if !report.updated_nodes.is_empty() {
            self.save(&handle, &graph).await?;
        }
        report.success = report.failed_nodes.is_empty();

        info!(
            "Batch position update on {}: {} updated, {} failed",
            handle,
            report.updated_nodes.len(),
            report.failed_nodes.len()
        );
        Ok(report)
    }

    /// Move one node. `Ok(false)` when the node does not exist.
    pub async fn update_node_position(
        &self,
        path: &str,
        node_id: &str,
        x: f64,
        y: f64,
    ) -> Result<bool, MutationError> {
        let report = self
            .batch_update_positions(path, &[PositionUpdate::new(node_id, x, y)])
            .await?;
        Ok(report.success)
    }

    // -----------------------------------------------------------------------
    // queries
    // -----------------------------------------------------------------------

    pub async fn children_of(&self, path: &str, node_id: &str) -> Result<Vec<CanvasNode>, MutationError> {
        let graph = self.snapshot(path).await?;
        let analyzer = RelationshipAnalyzer::new(&graph);
        Ok(analyzer.child_nodes(node_id).into_iter().cloned().collect())
    }

    pub async fn parent_of(&self, path: &str, node_id: &str) -> Result<Option<CanvasNode>, MutationError> {
        let graph = self.snapshot(path).await?;
        let analyzer = RelationshipAnalyzer::new(&graph);
        Ok(analyzer.parent_node(node_id).cloned())
    }

    pub async fn siblings_of(&self, path: &str, node_id: &str) -> Result<Vec<CanvasNode>, MutationError> {
        let graph = self.snapshot(path).await?;
        let analyzer = RelationshipAnalyzer::new(&graph);
        Ok(analyzer.sibling_nodes(node_id).into_iter().cloned().collect())
    }

    pub async fn hierarchy(&self, path: &str) -> Result<HierarchyTree, MutationError> {
        let graph = self.snapshot(path).await?;
        Ok(RelationshipAnalyzer::new(&graph).build_hierarchy_tree())
    }

    /// The layout a new child of `parent_id` would get from the full pipeline, including
    /// collision avoidance against every node that is not already one of its children.
    pub async fn preview_child_layout(
        &self,
        path: &str,
        parent_id: &str,
    ) -> Result<LayoutResult, MutationError> {
        let graph = self.snapshot(path).await?;
        let analyzer = RelationshipAnalyzer::new(&graph);
        let parent = graph
            .node(parent_id)
            .ok_or_else(|| MutationError::NodeNotFound(NodeId::from(parent_id)))?;
        let children = analyzer.child_nodes(parent_id);

        let mut calculator = SymmetricLayoutCalculator::new(self.config.clone());
        calculator.set_existing_nodes(
            graph
                .nodes
                .iter()
                .filter(|node| !children.iter().any(|child| child.id == node.id))
                .cloned()
                .collect(),
        );

        Ok(calculator.calculate_child_layout(parent, &children, None))
    }

    /// Current parsed contents of the document at `path`.
    pub async fn snapshot(&self, path: &str) -> Result<CanvasGraph, MutationError> {
        let handle = self.resolve(path).await?;
        self.load(&handle).await
    }

    // -----------------------------------------------------------------------
    // internals
    // -----------------------------------------------------------------------

    async fn insert_child_locked(
        &self,
        handle: &DocumentHandle,
        snapshot: Result<CanvasGraph, MutationError>,
        parent_id: &str,
        fallback: Point,
    ) -> Result<InsertOutcome, MutationError> {
        let relayout = match snapshot {
            Ok(before) => self.relayout_child(handle, before, parent_id).await,
            Err(err) => Err(err),
        };

        match relayout {
            Err(err) if err.is_transient() => {
                warn!("Re-layout under {} failed ({}), placing child at fallback position", parent_id, err);
                self.fallback_child(handle, parent_id, fallback).await
            }
            other => other,
        }
    }

    async fn relayout_child(
        &self,
        handle: &DocumentHandle,
        before: CanvasGraph,
        parent_id: &str,
    ) -> Result<InsertOutcome, MutationError> {
        let parent = before
            .node(parent_id)
            .ok_or_else(|| MutationError::NodeNotFound(NodeId::from(parent_id)))?;
        let analyzer = RelationshipAnalyzer::new(&before);
        let children: Vec<NodeId> = analyzer
            .child_nodes(parent_id)
            .iter()
            .map(|child| child.id.clone())
            .collect();

        let calculator = SymmetricLayoutCalculator::new(self.config.clone());
        let positions =
            calculator.calculate_symmetric_positions(parent, children.len() + 1, children.len());
        debug!(
            parent = parent_id,
            existing = children.len(),
            "re-flowing child column"
        );

        let mut graph = before.clone();
        let mut repositioned = Vec::with_capacity(children.len());
        for (child_id, position) in children.iter().zip(&positions) {
            if let Some(node) = graph.node_mut(child_id.as_str()) {
                node.x = position.x;
                node.y = position.y;
                repositioned.push(child_id.clone());
            }
        }

        let slot = &positions[children.len()];
        let node_id = self.add_text_node(&mut graph, NEW_CHILD_TEXT, Point::new(slot.x, slot.y))?;
        let edge_id = self.add_edge(&mut graph, &parent.id, &node_id)?;

        self.save(handle, &graph).await?;
        info!(
            "Added child {} under {} in {}, re-flowed {} existing children",
            node_id,
            parent_id,
            handle,
            repositioned.len()
        );

        Ok(InsertOutcome {
            diff: SnapshotDiff::between(&before, &graph),
            node_id,
            edge_id: Some(edge_id),
            repositioned,
            mode: InsertMode::Relayout,
        })
    }

    async fn fallback_child(
        &self,
        handle: &DocumentHandle,
        parent_id: &str,
        at: Point,
    ) -> Result<InsertOutcome, MutationError> {
        let before = self.load(handle).await?;
        let parent = before
            .node(parent_id)
            .ok_or_else(|| MutationError::NodeNotFound(NodeId::from(parent_id)))?
            .id
            .clone();

        let mut graph = before.clone();
        let node_id = self.add_text_node(&mut graph, NEW_CHILD_TEXT, at)?;
        let edge_id = self.add_edge(&mut graph, &parent, &node_id)?;
        self.save(handle, &graph).await?;
        info!("Added child {} under {} in {} at fallback position", node_id, parent_id, handle);

        Ok(InsertOutcome {
            diff: SnapshotDiff::between(&before, &graph),
            node_id,
            edge_id: Some(edge_id),
            repositioned: Vec::new(),
            mode: InsertMode::Fallback,
        })
    }

    async fn insert_unconnected(
        &self,
        handle: &DocumentHandle,
        before: CanvasGraph,
        at: Point,
    ) -> Result<InsertOutcome, MutationError> {
        let mut graph = before.clone();
        let node_id = self.add_text_node(&mut graph, NEW_INDEPENDENT_TEXT, at)?;
        self.save(handle, &graph).await?;
        info!("Added independent node {} in {} at ({}, {})", node_id, handle, at.x, at.y);

        Ok(InsertOutcome {
            diff: SnapshotDiff::between(&before, &graph),
            node_id,
            edge_id: None,
            repositioned: Vec::new(),
            mode: InsertMode::Independent,
        })
    }

    fn add_text_node(&self, graph: &mut CanvasGraph, text: &str, at: Point) -> Result<NodeId, MutationError> {
        let id = self.unique_node_id(graph)?;
        graph.nodes.push(CanvasNode::text(
            id.clone(),
            text,
            at.x,
            at.y,
            self.config.default_node_width,
            self.config.default_node_height,
        ));
        Ok(id)
    }

    /// Structural edge `edge-{parent}-{child}`. A colliding id gets a generated suffix.
    fn add_edge(&self, graph: &mut CanvasGraph, parent: &NodeId, child: &NodeId) -> Result<EdgeId, MutationError> {
        let base = format!("edge-{parent}-{child}");
        let id = if graph.contains_edge(&base) {
            (0..MAX_ID_ATTEMPTS)
                .map(|_| format!("{base}-{}", self.ids.next_id()))
                .find(|candidate| !graph.contains_edge(candidate))
                .ok_or(MutationError::IdExhausted("edge"))?
        } else {
            base
        };

        let id = EdgeId::from(id);
        graph
            .edges
            .push(CanvasEdge::structural(id.clone(), parent.clone(), child.clone()));
        Ok(id)
    }

    fn unique_node_id(&self, graph: &CanvasGraph) -> Result<NodeId, MutationError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = self.ids.next_id();
            if !graph.contains_node(&candidate) {
                return Ok(NodeId::from(candidate));
            }
            debug!("Generated node id {} already in use", candidate);
        }
        Err(MutationError::IdExhausted("node"))
    }

    async fn resolve(&self, path: &str) -> Result<DocumentHandle, MutationError> {
        self.store
            .resolve_handle(path)
            .await
            .ok_or_else(|| MutationError::DocumentNotFound(path.to_string()))
    }

    async fn lock_document(&self, handle: &DocumentHandle) -> DocumentGuard<'_> {
        let lock = self.locks.entry(handle.clone()).or_default().clone();
        DocumentGuard {
            locks: &self.locks,
            handle: handle.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Documents with a live lock entry.
    #[cfg(test)]
    pub(crate) fn locked_documents(&self) -> usize {
        self.locks.len()
    }

    async fn load(&self, handle: &DocumentHandle) -> Result<CanvasGraph, MutationError> {
        let text = self.store.read(handle).await?;
        Ok(parse_canvas(&text)?)
    }

    async fn save(&self, handle: &DocumentHandle, graph: &CanvasGraph) -> Result<(), MutationError> {
        let text = to_pretty_json(graph)?;
        self.store.write(handle, &text).await?;
        Ok(())
    }
}

/// Holds one document's lock. Dropping it releases the lock and forgets the document
/// once no other mutation is waiting on it.
struct DocumentGuard<'a> {
    locks: &'a DashMap<DocumentHandle, Arc<Mutex<()>>>,
    handle: DocumentHandle,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for DocumentGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.handle, |_, lock| Arc::strong_count(lock) == 1);
    }
}
