//! Tag extraction from note bodies and YAML frontmatter
//!
//! Tags are reported with a leading `#`. Inline tags are `#` followed by letters, digits,
//! `_` or `-`, at the start of the text or after whitespace. Frontmatter `tags` may be a
//! list or a comma separated string.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::Value;
use tracing::{debug, warn};

static INLINE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(#[a-zA-Z0-9_-]+)").expect("inline tag pattern"));

/// Inline `#tags` in order of first appearance, without duplicates.
pub fn inline_tags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for capture in INLINE_TAG.captures_iter(text) {
        let tag = &capture[1];
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Split a markdown document into its frontmatter block (without fences) and body.
pub fn split_frontmatter(text: &str) -> (Option<&str>, &str) {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return (None, text);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let body = &rest[offset + line.len()..];
            return (Some(&rest[..offset]), body);
        }
        offset += line.len();
    }
    (None, text)
}

/// Tags declared in a frontmatter block, normalized to a leading `#`.
pub fn frontmatter_tags(frontmatter: &str) -> Vec<String> {
    let value: Value = match serde_yaml::from_str(frontmatter) {
        Ok(value) => value,
        Err(e) => {
            warn!("Ignoring unparsable frontmatter: {}", e);
            return Vec::new();
        }
    };

    let raw: Vec<String> = match value.get("tags") {
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };

    let mut tags: Vec<String> = Vec::new();
    for tag in raw {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        let tag = if tag.starts_with('#') {
            tag.to_string()
        } else {
            format!("#{tag}")
        };
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Inline tags of the body followed by frontmatter tags not already present.
pub fn markdown_tags(text: &str) -> Vec<String> {
    let (frontmatter, body) = split_frontmatter(text);
    let mut tags = inline_tags(body);
    if let Some(frontmatter) = frontmatter {
        for tag in frontmatter_tags(frontmatter) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags
}

/// Looks up the tags of a note referenced by a file card.
pub trait TagSource {
    fn tags_for(&self, path: &str) -> Vec<String>;
}

/// Reads notes from a vault directory.
#[derive(Debug, Clone)]
pub struct VaultTags {
    root: PathBuf,
}

impl VaultTags {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        VaultTags { root: root.into() }
    }
}

impl TagSource for VaultTags {
    fn tags_for(&self, path: &str) -> Vec<String> {
        if !path.ends_with(".md") {
            return Vec::new();
        }
        match std::fs::read_to_string(self.root.join(path)) {
            Ok(text) => markdown_tags(&text),
            Err(e) => {
                debug!("No tags for {}: {}", path, e);
                Vec::new()
            }
        }
    }
}

/// Tag source for cards without a backing vault.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTags;

impl TagSource for NoTags {
    fn tags_for(&self, _path: &str) -> Vec<String> {
        Vec::new()
    }
}
