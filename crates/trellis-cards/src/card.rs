//! Cards: listable entries for canvas nodes and vault notes

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use trellis_core::{CanvasGraph, NodeContent};

use crate::settings::CardSettings;
use crate::tags::{inline_tags, TagSource};

/// Characters of a text node shown as its card title.
pub const TITLE_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CardKind {
    /// Backed by a note in the vault.
    File { path: String },
    /// Inline text living on a canvas.
    Native { content: String, canvas: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub id: String,
    pub kind: CardKind,
    pub title: String,
    pub tags: Vec<String>,
    pub modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl Card {
    pub fn is_file(&self) -> bool {
        matches!(self.kind, CardKind::File { .. })
    }

    pub fn path(&self) -> Option<&str> {
        match &self.kind {
            CardKind::File { path } => Some(path),
            CardKind::Native { .. } => None,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            CardKind::Native { content, .. } => Some(content),
            CardKind::File { .. } => None,
        }
    }

    /// Creation time, or modification time when unknown.
    pub fn created_or_modified(&self) -> DateTime<Utc> {
        self.created.unwrap_or(self.modified)
    }
}

/// Card title for a note path: the file name, with `.md` dropped unless extensions are shown.
pub fn file_title(path: &str, show_extension: bool) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    if show_extension {
        return name.to_string();
    }
    name.strip_suffix(".md").unwrap_or(name).to_string()
}

/// First [`TITLE_PREVIEW_CHARS`] characters of the text, with `...` when cut.
pub fn text_title(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(TITLE_PREVIEW_CHARS).collect();
    let title = if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    };
    title.trim().to_string()
}

/// One card per file node and per non-blank text node on the canvas. All cards take the
/// canvas's modification time.
pub fn cards_from_canvas(
    canvas_path: &str,
    graph: &CanvasGraph,
    modified: DateTime<Utc>,
    settings: &CardSettings,
    tags: &dyn TagSource,
) -> Vec<Card> {
    let cards: Vec<Card> = graph
        .nodes
        .iter()
        .filter_map(|node| {
            let id = format!("{canvas_path}#{}", node.id);
            match &node.content {
                NodeContent::File { path } => Some(Card {
                    id,
                    title: file_title(path, settings.show_file_extensions),
                    tags: tags.tags_for(path),
                    kind: CardKind::File { path: path.clone() },
                    modified,
                    created: None,
                }),
                NodeContent::Text { text } if !text.trim().is_empty() => Some(Card {
                    id,
                    title: text_title(text),
                    tags: inline_tags(text),
                    kind: CardKind::Native {
                        content: text.clone(),
                        canvas: canvas_path.to_string(),
                    },
                    modified,
                    created: None,
                }),
                NodeContent::Text { .. } => None,
            }
        })
        .collect();

    debug!("{} cards from canvas {}", cards.len(), canvas_path);
    cards
}
