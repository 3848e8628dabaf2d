//! Vault scanning: markdown notes and canvas documents under a root directory

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use tracing::{debug, info};
use trellis_core::parse_canvas;

use crate::card::{cards_from_canvas, file_title, Card, CardKind};
use crate::error::CardError;
use crate::settings::CardSettings;
use crate::tags::{markdown_tags, VaultTags};

/// Vault-relative files with `extension`, sorted, using `/` separators. Respects
/// `.gitignore` and skips hidden entries.
fn files_with_extension(root: &Path, extension: &str) -> Result<Vec<String>, CardError> {
    let mut files = Vec::new();
    for entry in WalkBuilder::new(root).build() {
        let entry = entry?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        if let Some(relative) = relative_key(root, path) {
            files.push(relative);
        }
    }
    files.sort();
    Ok(files)
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

/// Canvas documents in the vault.
pub fn canvas_files(root: &Path) -> Result<Vec<String>, CardError> {
    files_with_extension(root, "canvas")
}

/// File cards for markdown notes. With `folder` set, notes anywhere below that folder;
/// otherwise only notes at the vault root. At most twice `max_cards_per_view` notes are
/// read, leaving room for filtering.
pub fn scan_vault(root: &Path, folder: Option<&str>, settings: &CardSettings) -> Result<Vec<Card>, CardError> {
    let folder = folder.map(|f| f.trim_matches('/')).filter(|f| !f.is_empty());
    let prefix = folder.map(|f| format!("{f}/"));

    let notes: Vec<String> = files_with_extension(root, "md")?
        .into_iter()
        .filter(|path| match &prefix {
            Some(prefix) => path.starts_with(prefix.as_str()),
            None => !path.contains('/'),
        })
        .take(settings.max_cards_per_view.saturating_mul(2))
        .collect();

    let mut cards = Vec::with_capacity(notes.len());
    for path in notes {
        let full = root.join(&path);
        let text = std::fs::read_to_string(&full).map_err(|source| CardError::Io {
            path: full.clone(),
            source,
        })?;
        let (modified, created) = timestamps(&full)?;
        cards.push(Card {
            id: path.clone(),
            title: file_title(&path, settings.show_file_extensions),
            tags: markdown_tags(&text),
            kind: CardKind::File { path },
            modified,
            created,
        });
    }

    info!(
        "Scanned {} notes in {}",
        cards.len(),
        folder.unwrap_or("vault root")
    );
    Ok(cards)
}

/// Read a canvas from the vault and build its cards, resolving note tags from the vault.
pub fn load_canvas_cards(root: &Path, canvas_path: &str, settings: &CardSettings) -> Result<Vec<Card>, CardError> {
    let full: PathBuf = root.join(canvas_path);
    let text = std::fs::read_to_string(&full).map_err(|source| CardError::Io {
        path: full.clone(),
        source,
    })?;
    let graph = parse_canvas(&text).map_err(|source| CardError::Canvas {
        path: full.clone(),
        source,
    })?;
    let (modified, _) = timestamps(&full)?;
    debug!("Loaded canvas {} with {} nodes", canvas_path, graph.node_count());

    Ok(cards_from_canvas(
        canvas_path,
        &graph,
        modified,
        settings,
        &VaultTags::new(root),
    ))
}

fn timestamps(path: &Path) -> Result<(DateTime<Utc>, Option<DateTime<Utc>>), CardError> {
    let meta = std::fs::metadata(path).map_err(|source| CardError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let created = meta.created().ok().map(DateTime::<Utc>::from);
    Ok((DateTime::<Utc>::from(modified), created))
}
