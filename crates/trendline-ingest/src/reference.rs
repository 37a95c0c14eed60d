//! Ingested references and the aggregate result.

use crate::text::truncate_chars;
use serde::{Deserialize, Serialize};

/// Source tag used for free text typed by the user.
pub const USER_INPUT_SOURCE: &str = "user_input";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Text,
    File,
    Url,
}

/// One successfully ingested piece of evidence.
///
/// `content` is whitespace-collapsed, truncated to the per-entry budget, and
/// never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub kind: ReferenceKind,
    pub source: String,
    pub content: String,
}

impl ReferenceEntry {
    /// Returns `None` when `content` is empty; callers treat that as a failure.
    pub fn new(kind: ReferenceKind, source: &str, content: &str, max_chars: usize) -> Option<Self> {
        if content.is_empty() {
            return None;
        }
        Some(Self {
            kind,
            source: source.to_string(),
            content: truncate_chars(content, max_chars),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionStatus {
    /// No evidence was submitted.
    Empty,
    /// Every submitted source succeeded.
    Success,
    /// Some sources succeeded, some failed.
    Partial,
    /// Evidence was submitted but nothing succeeded.
    Failed,
}

impl IngestionStatus {
    pub fn from_counts(attempted: bool, succeeded: usize, failed: usize) -> Self {
        match (attempted, succeeded, failed) {
            (false, _, _) => Self::Empty,
            (true, 0, _) => Self::Failed,
            (true, _, 0) => Self::Success,
            (true, _, _) => Self::Partial,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionResult {
    pub status: IngestionStatus,
    pub entries: Vec<ReferenceEntry>,
    pub errors: Vec<String>,
}

impl IngestionResult {
    pub fn empty() -> Self {
        Self {
            status: IngestionStatus::Empty,
            entries: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn has_references(&self) -> bool {
        !self.entries.is_empty()
    }
}

impl Default for IngestionResult {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table() {
        assert_eq!(IngestionStatus::from_counts(false, 0, 0), IngestionStatus::Empty);
        assert_eq!(IngestionStatus::from_counts(true, 2, 0), IngestionStatus::Success);
        assert_eq!(IngestionStatus::from_counts(true, 1, 1), IngestionStatus::Partial);
        assert_eq!(IngestionStatus::from_counts(true, 0, 3), IngestionStatus::Failed);
    }

    #[test]
    fn empty_content_is_not_an_entry() {
        assert!(ReferenceEntry::new(ReferenceKind::Text, USER_INPUT_SOURCE, "", 10).is_none());
        let e = ReferenceEntry::new(ReferenceKind::Url, "https://a.example", "abcdef", 3).unwrap();
        assert_eq!(e.content, "abc…");
    }

    #[test]
    fn serializes_lowercase_tags() {
        let r = IngestionResult {
            status: IngestionStatus::Partial,
            entries: vec![ReferenceEntry::new(ReferenceKind::File, "a.pdf", "x", 10).unwrap()],
            errors: vec!["cannot access link: https://b.example".to_string()],
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["status"], "partial");
        assert_eq!(v["entries"][0]["kind"], "file");
    }
}
