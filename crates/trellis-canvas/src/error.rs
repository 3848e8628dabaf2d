//! Error types for document stores and graph mutations

use thiserror::Error;
use trellis_core::{CanvasError, NodeId, ValidationError};

/// Failure reported by a [`DocumentStore`](crate::DocumentStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("no canvas document at {0}")]
    DocumentNotFound(String),

    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("invalid canvas: {0}")]
    Validation(#[from] ValidationError),

    #[error("document store failure: {0}")]
    Store(#[from] StoreError),

    #[error("canvas document is not valid JSON: {0}")]
    Parse(serde_json::Error),

    #[error("failed to serialize canvas: {0}")]
    Serialize(String),

    #[error("could not generate a unique {0} id")]
    IdExhausted(&'static str),
}

impl MutationError {
    /// Failures that may not recur on a fresh read: store I/O and unparsable text.
    pub fn is_transient(&self) -> bool {
        matches!(self, MutationError::Store(_) | MutationError::Parse(_))
    }
}

impl From<CanvasError> for MutationError {
    fn from(err: CanvasError) -> Self {
        match err {
            CanvasError::Parse(e) => MutationError::Parse(e),
            CanvasError::Validation(e) => MutationError::Validation(e),
            CanvasError::Encoding(e) => MutationError::Serialize(e.to_string()),
        }
    }
}
