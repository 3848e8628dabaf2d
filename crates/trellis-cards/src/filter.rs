//! Search, tag filtering, sorting and truncation of card lists

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use crate::card::Card;
use crate::settings::{CardSettings, SortBy, SortOrder};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardQuery {
    /// Case-insensitive substring over title, note path and text content.
    pub search: Option<String>,
    /// A card matches when any of its tags contains any of these (case-insensitive,
    /// leading `#` ignored). Empty means no tag filter.
    pub tags: Vec<String>,
    pub sort_by: Option<SortBy>,
    pub order: Option<SortOrder>,
    pub prioritize_documents: Option<bool>,
    pub limit: Option<usize>,
}

impl CardQuery {
    /// Query that only applies the settings' defaults.
    pub fn from_settings(settings: &CardSettings) -> Self {
        CardQuery {
            sort_by: Some(settings.default_sort_by),
            prioritize_documents: Some(settings.prioritize_document_nodes),
            limit: Some(settings.max_cards_per_view),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    /// Cards before filtering.
    pub total: usize,
    /// Cards matching search and tags, before truncation.
    pub filtered: usize,
    pub file_cards: usize,
    pub native_cards: usize,
    pub tagged_cards: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    pub cards: Vec<Card>,
    pub stats: FilterStats,
    pub truncated: bool,
}

pub fn matches_search(card: &Card, query: &str) -> bool {
    let query = query.to_lowercase();
    card.title.to_lowercase().contains(&query)
        || card.path().is_some_and(|p| p.to_lowercase().contains(&query))
        || card.content().is_some_and(|c| c.to_lowercase().contains(&query))
}

pub fn matches_tags(card: &Card, selected: &[String]) -> bool {
    selected.iter().any(|wanted| {
        let wanted = wanted.trim_start_matches('#').to_lowercase();
        card.tags.iter().any(|tag| tag.to_lowercase().contains(&wanted))
    })
}

fn compare(a: &Card, b: &Card, sort_by: SortBy) -> Ordering {
    match sort_by {
        SortBy::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortBy::Modified => a.modified.cmp(&b.modified),
        SortBy::Created => a.created_or_modified().cmp(&b.created_or_modified()),
    }
}

/// Filter, then sort, then move file cards first when prioritizing, then truncate.
/// Settings fill in whatever the query leaves unset.
pub fn apply_query(cards: Vec<Card>, query: &CardQuery, settings: &CardSettings) -> CardView {
    let total = cards.len();

    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let mut cards: Vec<Card> = cards
        .into_iter()
        .filter(|card| search.is_none_or(|q| matches_search(card, q)))
        .filter(|card| query.tags.is_empty() || matches_tags(card, &query.tags))
        .collect();

    let stats = FilterStats {
        total,
        filtered: cards.len(),
        file_cards: cards.iter().filter(|c| c.is_file()).count(),
        native_cards: cards.iter().filter(|c| !c.is_file()).count(),
        tagged_cards: cards.iter().filter(|c| !c.tags.is_empty()).count(),
    };

    let sort_by = query.sort_by.unwrap_or(settings.default_sort_by);
    let order = query.order.unwrap_or_else(|| sort_by.default_order());
    cards.sort_by(|a, b| match order {
        SortOrder::Asc => compare(a, b, sort_by),
        SortOrder::Desc => compare(b, a, sort_by),
    });

    if query
        .prioritize_documents
        .unwrap_or(settings.prioritize_document_nodes)
    {
        // stable: keeps the sort within each group
        cards.sort_by_key(|card| !card.is_file());
    }

    let limit = query.limit.unwrap_or(settings.max_cards_per_view);
    let truncated = cards.len() > limit;
    cards.truncate(limit);

    debug!(
        total = stats.total,
        filtered = stats.filtered,
        shown = cards.len(),
        "card query applied"
    );
    CardView {
        cards,
        stats,
        truncated,
    }
}

/// Every tag across the cards, sorted and deduplicated.
pub fn all_tags(cards: &[Card]) -> Vec<String> {
    let mut tags: Vec<String> = cards.iter().flat_map(|c| c.tags.iter().cloned()).collect();
    tags.sort();
    tags.dedup();
    tags
}
