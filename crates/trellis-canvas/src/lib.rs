//! Trellis Canvas: document stores and the graph mutation coordinator

pub mod error;
pub mod store;
pub mod ids;
pub mod coordinator;

#[cfg(test)]
pub mod tests;

pub use error::{MutationError, StoreError};
pub use store::{DocumentHandle, DocumentStore, FsDocumentStore, MemoryDocumentStore};
pub use ids::{IdSource, RandomIds, SequentialIds};
pub use coordinator::{
    BatchUpdateReport, GraphMutationCoordinator, InsertMode, InsertOutcome, PositionUpdate,
};
