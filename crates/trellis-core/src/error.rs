//! Error types for snapshot parsing and validation

use thiserror::Error;

use crate::model::NodeId;

/// A snapshot, node or edge that does not conform to the canvas schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("canvas document is not a JSON object")]
    NotAnObject,

    #[error("canvas document has no `{0}` array")]
    MissingCollection(&'static str),

    #[error("node #{index} is malformed: {reason}")]
    MalformedNode { index: usize, reason: String },

    #[error("edge #{index} is malformed: {reason}")]
    MalformedEdge { index: usize, reason: String },

    #[error("empty identifier")]
    EmptyId,

    #[error("node {id} has a non-finite coordinate")]
    NonFiniteCoordinate { id: NodeId },

    #[error("node {id} has invalid dimensions {width}x{height}")]
    InvalidDimensions { id: NodeId, width: f64, height: f64 },

    #[error("node {id} has unknown type `{kind}`")]
    UnknownNodeType { id: NodeId, kind: String },

    #[error("node {id} is missing its `{expected}` payload")]
    MissingPayload { id: NodeId, expected: &'static str },

    #[error("node {id} carries both a file reference and inline text")]
    ConflictingPayload { id: NodeId },

    #[error("duplicate node id {0}")]
    DuplicateNodeId(NodeId),

    #[error("edge {edge} has unknown side `{side}`")]
    UnknownSide { edge: String, side: String },

    #[error("position ({x}, {y}) is not finite")]
    NonFinitePoint { x: f64, y: f64 },

    #[error("layout setting `{field}` = {value} is out of range")]
    InvalidLayoutConfig { field: &'static str, value: f64 },
}

/// Failure to turn document text into a snapshot (or back).
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("canvas document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid canvas: {0}")]
    Validation(#[from] ValidationError),

    #[error("serialized canvas is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}
