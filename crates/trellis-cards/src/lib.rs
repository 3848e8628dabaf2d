//! Trellis Cards: card indexing, tag extraction and filtering over canvases and vault notes

pub mod card;
pub mod tags;
pub mod vault;
pub mod filter;
pub mod settings;
pub mod error;


pub use card::{Card, CardKind, cards_from_canvas};
pub use tags::{TagSource, VaultTags, NoTags, inline_tags, frontmatter_tags, markdown_tags};
pub use vault::{scan_vault, load_canvas_cards, canvas_files};
pub use filter::{CardQuery, CardView, FilterStats, all_tags, apply_query};
pub use settings::{CardSettings, SortBy, SortOrder};
pub use error::CardError;
