//! Trellis Core: canvas model, wire format, relationship inference and symmetric layout

pub mod model;
pub mod error;
pub mod wire;
pub mod relationships;
pub mod layout;
pub mod topology;
pub mod diff;


#[cfg(test)]
pub mod test_utils;

pub use model::{NodeId, EdgeId, Side, NodeContent, Point, Rect, CanvasNode, CanvasEdge, CanvasGraph};
pub use error::{CanvasError, ValidationError};
pub use wire::{WireNode, WireEdge, parse_canvas, to_pretty_json};
pub use relationships::{NodeRelationship, HierarchyTree, RelationshipAnalyzer};
pub use layout::{LayoutConfig, LayoutConfigPatch, ChildPosition, LayoutResult, LayoutWarning, ExistingLayout, SymmetricLayoutCalculator, SYMMETRY_TOLERANCE};
pub use topology::Topology;
pub use diff::{SnapshotDiff, NodeMove};
