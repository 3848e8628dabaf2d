//! Core data structures for the canvas graph

use std::fmt;
use std::str::FromStr;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Identifier of a node, unique within one canvas.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId(id)
    }
}

/// Edge identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        EdgeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(id: &str) -> Self {
        EdgeId(id.to_string())
    }
}

impl From<String> for EdgeId {
    fn from(id: String) -> Self {
        EdgeId(id)
    }
}

/// Which side of a node an edge attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Right => "right",
            Side::Bottom => "bottom",
            Side::Left => "left",
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" => Ok(Side::Top),
            "right" => Ok(Side::Right),
            "bottom" => Ok(Side::Bottom),
            "left" => Ok(Side::Left),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a node: a reference to an external document, or inline text.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    File { path: String },
    Text { text: String },
}

impl NodeContent {
    /// The `type` discriminator used on the wire.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeContent::File { .. } => "file",
            NodeContent::Text { .. } => "text",
        }
    }

    pub fn file(&self) -> Option<&str> {
        match self {
            NodeContent::File { path } => Some(path),
            NodeContent::Text { .. } => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            NodeContent::Text { text } => Some(text),
            NodeContent::File { .. } => None,
        }
    }
}

/// A point on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.x.is_finite() && self.y.is_finite() {
            Ok(())
        } else {
            Err(ValidationError::NonFinitePoint { x: self.x, y: self.y })
        }
    }
}

/// Coordinates must be finite; dimensions finite and positive.
pub(crate) fn check_geometry(id: &NodeId, x: f64, y: f64, width: f64, height: f64) -> Result<(), ValidationError> {
    if !x.is_finite() || !y.is_finite() {
        return Err(ValidationError::NonFiniteCoordinate { id: id.clone() });
    }
    let valid_dimension = |v: f64| v.is_finite() && v > 0.0;
    if !valid_dimension(width) || !valid_dimension(height) {
        return Err(ValidationError::InvalidDimensions {
            id: id.clone(),
            width,
            height,
        });
    }
    Ok(())
}

/// Axis-aligned rectangle, top-left anchored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// True when the two rectangles are apart by at least `margin` along some axis.
    pub fn is_separated_from(&self, other: &Rect, margin: f64) -> bool {
        self.right() + margin <= other.x
            || other.right() + margin <= self.x
            || self.bottom() + margin <= other.y
            || other.bottom() + margin <= self.y
    }

    pub fn overlaps(&self, other: &Rect, margin: f64) -> bool {
        !self.is_separated_from(other, margin)
    }
}

/// A single node on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasNode {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub content: NodeContent,
    /// Host-specific fields (color, label, ...) carried through untouched.
    pub extra: Map<String, Value>,
}

impl CanvasNode {
    pub fn text(id: impl Into<NodeId>, text: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        CanvasNode {
            id: id.into(),
            x,
            y,
            width,
            height,
            content: NodeContent::Text { text: text.into() },
            extra: Map::new(),
        }
    }

    pub fn file(id: impl Into<NodeId>, path: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        CanvasNode {
            id: id.into(),
            x,
            y,
            width,
            height,
            content: NodeContent::File { path: path.into() },
            extra: Map::new(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Same rules the parser applies to a document node.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.as_str().trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        check_geometry(&self.id, self.x, self.y, self.width, self.height)?;
        match &self.content {
            NodeContent::File { path } if path.trim().is_empty() => Err(ValidationError::MissingPayload {
                id: self.id.clone(),
                expected: "file",
            }),
            _ => Ok(()),
        }
    }
}

/// A directed edge. `from_node` is the structural parent of `to_node`.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasEdge {
    pub id: EdgeId,
    pub from_node: NodeId,
    pub from_side: Side,
    pub to_node: NodeId,
    pub to_side: Side,
    pub extra: Map<String, Value>,
}

impl CanvasEdge {
    /// Parent-to-child edge leaving the parent's right side and entering the child's left side.
    pub fn structural(id: impl Into<EdgeId>, from: NodeId, to: NodeId) -> Self {
        CanvasEdge {
            id: id.into(),
            from_node: from,
            from_side: Side::Right,
            to_node: to,
            to_side: Side::Left,
            extra: Map::new(),
        }
    }
}

/// A full canvas snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanvasGraph {
    pub nodes: Vec<CanvasNode>,
    pub edges: Vec<CanvasEdge>,
    pub extra: Map<String, Value>,
}

impl CanvasGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parts(nodes: Vec<CanvasNode>, edges: Vec<CanvasEdge>) -> Self {
        CanvasGraph {
            nodes,
            edges,
            extra: Map::new(),
        }
    }

    /// Every node valid, node ids unique, edges fully identified.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            node.validate()?;
            if !seen.insert(&node.id) {
                return Err(ValidationError::DuplicateNodeId(node.id.clone()));
            }
        }
        for edge in &self.edges {
            if edge.id.as_str().trim().is_empty()
                || edge.from_node.as_str().is_empty()
                || edge.to_node.as_str().is_empty()
            {
                return Err(ValidationError::EmptyId);
            }
        }
        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&CanvasNode> {
        self.nodes.iter().find(|n| n.id.as_str() == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut CanvasNode> {
        self.nodes.iter_mut().find(|n| n.id.as_str() == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.edges.iter().any(|e| e.id.as_str() == id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
