use std::path::PathBuf;

use thiserror::Error;
use trellis_core::CanvasError;

#[derive(Debug, Error)]
pub enum CardError {
    #[error("failed to walk vault: {0}")]
    Walk(#[from] ignore::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid canvas {path}: {source}")]
    Canvas {
        path: PathBuf,
        #[source]
        source: CanvasError,
    },
}
