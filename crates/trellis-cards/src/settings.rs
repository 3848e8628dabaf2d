//! Card listing preferences

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Title,
    #[default]
    Modified,
    /// Creation time where the filesystem reports it, modification time otherwise.
    Created,
}

impl SortBy {
    /// Titles read A to Z, timestamps newest first.
    pub fn default_order(self) -> SortOrder {
        match self {
            SortBy::Title => SortOrder::Asc,
            SortBy::Modified | SortBy::Created => SortOrder::Desc,
        }
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "title" => Ok(SortBy::Title),
            "modified" => Ok(SortBy::Modified),
            "created" => Ok(SortBy::Created),
            other => Err(format!("unknown sort key `{other}` (expected title, modified or created)")),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortBy::Title => "title",
            SortBy::Modified => "modified",
            SortBy::Created => "created",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order `{other}` (expected asc or desc)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardSettings {
    pub default_sort_by: SortBy,
    /// Show `.md` in file card titles.
    pub show_file_extensions: bool,
    pub max_cards_per_view: usize,
    /// List document-backed cards before inline text cards.
    pub prioritize_document_nodes: bool,
}

impl Default for CardSettings {
    fn default() -> Self {
        CardSettings {
            default_sort_by: SortBy::Modified,
            show_file_extensions: false,
            max_cards_per_view: 1000,
            prioritize_document_nodes: false,
        }
    }
}
