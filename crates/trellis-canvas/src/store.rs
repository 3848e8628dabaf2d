//! Document stores holding serialized canvases

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::error::StoreError;

/// Store-relative key of a resolved document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentHandle(String);

impl DocumentHandle {
    pub fn new(key: impl Into<String>) -> Self {
        DocumentHandle(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read/write access to canvas documents by path.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// `None` when no document exists at `path`.
    async fn resolve_handle(&self, path: &str) -> Option<DocumentHandle>;

    async fn read(&self, handle: &DocumentHandle) -> Result<String, StoreError>;

    async fn write(&self, handle: &DocumentHandle, contents: &str) -> Result<(), StoreError>;
}

/// Normalize a store-relative path: forward slashes, no `.` segments, no leading `/`.
/// Paths escaping the root with `..` are rejected.
pub fn normalize_key(path: &str) -> Option<String> {
    let mut parts = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?.to_string()),
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Documents on disk below a vault root.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsDocumentStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn location(&self, handle: &DocumentHandle) -> PathBuf {
        self.root.join(handle.as_str())
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn resolve_handle(&self, path: &str) -> Option<DocumentHandle> {
        let key = normalize_key(path)?;
        let handle = DocumentHandle(key);
        match tokio::fs::metadata(self.location(&handle)).await {
            Ok(meta) if meta.is_file() => Some(handle),
            _ => None,
        }
    }

    async fn read(&self, handle: &DocumentHandle) -> Result<String, StoreError> {
        let path = self.location(handle);
        debug!("Reading document {:?}", path);
        tokio::fs::read_to_string(&path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(handle.to_string())
            } else {
                StoreError::Io {
                    path: handle.to_string(),
                    source,
                }
            }
        })
    }

    /// Writes a hidden sibling file and renames it over the document, so readers see
    /// either the old or the new contents.
    async fn write(&self, handle: &DocumentHandle, contents: &str) -> Result<(), StoreError> {
        let path = self.location(handle);
        let staging = staging_path(&path);
        debug!("Writing document {:?} ({} bytes)", path, contents.len());

        let io_err = |source: std::io::Error| StoreError::Io {
            path: handle.to_string(),
            source,
        };
        if let Err(source) = tokio::fs::write(&staging, contents).await {
            return Err(io_err(source));
        }
        if let Err(source) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(io_err(source));
        }
        Ok(())
    }
}

/// `dir/.name.tmp` next to `dir/name`.
pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

/// In-memory documents keyed by normalized path.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: DashMap<String, String>,
    writes: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a document. Paths that do not normalize are ignored.
    pub fn insert(&self, path: &str, contents: impl Into<String>) {
        if let Some(key) = normalize_key(path) {
            self.documents.insert(key, contents.into());
        }
    }

    pub fn get(&self, path: &str) -> Option<String> {
        let key = normalize_key(path)?;
        self.documents.get(&key).map(|doc| doc.value().clone())
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn resolve_handle(&self, path: &str) -> Option<DocumentHandle> {
        let key = normalize_key(path)?;
        self.documents.contains_key(&key).then(|| DocumentHandle(key))
    }

    async fn read(&self, handle: &DocumentHandle) -> Result<String, StoreError> {
        self.documents
            .get(handle.as_str())
            .map(|doc| doc.value().clone())
            .ok_or_else(|| StoreError::NotFound(handle.to_string()))
    }

    async fn write(&self, handle: &DocumentHandle, contents: &str) -> Result<(), StoreError> {
        self.documents.insert(handle.0.clone(), contents.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
