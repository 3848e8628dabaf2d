//! JSON wire format for canvas documents
//!
//! Documents are objects with two required arrays, `nodes` and `edges`. Nodes carry a
//! `type` discriminator (`file` or `text`) and exactly one matching payload field.
//! Unknown fields at any level are preserved so a parse/serialize round trip only
//! changes whitespace.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CanvasError, ValidationError};
use crate::model::{check_geometry, CanvasEdge, CanvasGraph, CanvasNode, EdgeId, NodeContent, NodeId, Side};

/// A node exactly as it appears in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An edge exactly as it appears in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEdge {
    pub id: String,
    pub from_node: String,
    pub from_side: String,
    pub to_node: String,
    pub to_side: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize)]
struct WireCanvas {
    nodes: Vec<WireNode>,
    edges: Vec<WireEdge>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<WireNode> for CanvasNode {
    type Error = ValidationError;

    fn try_from(wire: WireNode) -> Result<Self, Self::Error> {
        if wire.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        let id = NodeId(wire.id);

        check_geometry(&id, wire.x, wire.y, wire.width, wire.height)?;

        let content = match (wire.kind.as_str(), wire.file, wire.text) {
            ("file", Some(path), None) if !path.trim().is_empty() => NodeContent::File { path },
            ("file", _, Some(_)) | ("text", Some(_), _) => {
                return Err(ValidationError::ConflictingPayload { id });
            }
            ("file", _, None) => {
                return Err(ValidationError::MissingPayload { id, expected: "file" });
            }
            ("text", None, Some(text)) => NodeContent::Text { text },
            ("text", None, None) => {
                return Err(ValidationError::MissingPayload { id, expected: "text" });
            }
            (other, _, _) => {
                return Err(ValidationError::UnknownNodeType {
                    id,
                    kind: other.to_string(),
                });
            }
        };

        Ok(CanvasNode {
            id,
            x: wire.x,
            y: wire.y,
            width: wire.width,
            height: wire.height,
            content,
            extra: wire.extra,
        })
    }
}

impl From<&CanvasNode> for WireNode {
    fn from(node: &CanvasNode) -> Self {
        WireNode {
            id: node.id.0.clone(),
            x: node.x,
            y: node.y,
            width: node.width,
            height: node.height,
            kind: node.content.type_name().to_string(),
            file: node.content.file().map(str::to_string),
            text: node.content.text().map(str::to_string),
            extra: node.extra.clone(),
        }
    }
}

impl TryFrom<WireEdge> for CanvasEdge {
    type Error = ValidationError;

    fn try_from(wire: WireEdge) -> Result<Self, Self::Error> {
        if wire.id.trim().is_empty() || wire.from_node.is_empty() || wire.to_node.is_empty() {
            return Err(ValidationError::EmptyId);
        }
        let side = |raw: &str| {
            raw.parse::<Side>().map_err(|side| ValidationError::UnknownSide {
                edge: wire.id.clone(),
                side,
            })
        };
        let from_side = side(&wire.from_side)?;
        let to_side = side(&wire.to_side)?;

        Ok(CanvasEdge {
            id: EdgeId(wire.id),
            from_node: NodeId(wire.from_node),
            from_side,
            to_node: NodeId(wire.to_node),
            to_side,
            extra: wire.extra,
        })
    }
}

impl From<&CanvasEdge> for WireEdge {
    fn from(edge: &CanvasEdge) -> Self {
        WireEdge {
            id: edge.id.0.clone(),
            from_node: edge.from_node.0.clone(),
            from_side: edge.from_side.as_str().to_string(),
            to_node: edge.to_node.0.clone(),
            to_side: edge.to_side.as_str().to_string(),
            extra: edge.extra.clone(),
        }
    }
}

/// Parse and validate a canvas document.
pub fn parse_canvas(text: &str) -> Result<CanvasGraph, CanvasError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(mut root) = value else {
        return Err(ValidationError::NotAnObject.into());
    };

    let raw_nodes = take_array(&mut root, "nodes")?;
    let raw_edges = take_array(&mut root, "edges")?;

    let mut seen = HashSet::with_capacity(raw_nodes.len());
    let mut nodes = Vec::with_capacity(raw_nodes.len());
    for (index, raw) in raw_nodes.into_iter().enumerate() {
        let wire: WireNode = serde_json::from_value(raw).map_err(|e| ValidationError::MalformedNode {
            index,
            reason: e.to_string(),
        })?;
        let node = CanvasNode::try_from(wire)?;
        if !seen.insert(node.id.clone()) {
            return Err(ValidationError::DuplicateNodeId(node.id).into());
        }
        nodes.push(node);
    }

    let mut edges = Vec::with_capacity(raw_edges.len());
    for (index, raw) in raw_edges.into_iter().enumerate() {
        let wire: WireEdge = serde_json::from_value(raw).map_err(|e| ValidationError::MalformedEdge {
            index,
            reason: e.to_string(),
        })?;
        edges.push(CanvasEdge::try_from(wire)?);
    }

    Ok(CanvasGraph {
        nodes,
        edges,
        extra: root,
    })
}

fn take_array(root: &mut Map<String, Value>, key: &'static str) -> Result<Vec<Value>, ValidationError> {
    match root.remove(key) {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(ValidationError::MissingCollection(key)),
    }
}

/// Serialize a snapshot as tab-indented JSON, the layout host canvas files use. Refuses
/// snapshots that [`parse_canvas`] would reject.
pub fn to_pretty_json(graph: &CanvasGraph) -> Result<String, CanvasError> {
    graph.validate()?;
    let wire = WireCanvas {
        nodes: graph.nodes.iter().map(WireNode::from).collect(),
        edges: graph.edges.iter().map(WireEdge::from).collect(),
        extra: graph.extra.clone(),
    };

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    wire.serialize(&mut serializer)?;
    Ok(String::from_utf8(buf)?)
}

impl CanvasGraph {
    /// Shorthand for [`parse_canvas`].
    pub fn from_json(text: &str) -> Result<Self, CanvasError> {
        parse_canvas(text)
    }

    /// Shorthand for [`to_pretty_json`].
    pub fn to_json(&self) -> Result<String, CanvasError> {
        to_pretty_json(self)
    }
}
