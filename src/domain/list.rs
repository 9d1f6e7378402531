//! List identity and metadata
//!
//! A list is identified by its URL on the tracking site. Metadata comes from the
//! lists-of-lists overview page; a `SelectableList` is the immutable snapshot the
//! scheduler builds from it when a scan starts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque list identifier (the list URL as it appears on the overview page)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(String);

impl ListId {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ListId {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for ListId {
    fn from(url: String) -> Self {
        Self(url)
    }
}

impl AsRef<str> for ListId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw list information read from the overview page.
///
/// Counts are optional: progress markup that is missing or unparseable leaves
/// them `None`, and such a list cannot be scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMetadata {
    pub id: ListId,
    pub title: String,
    pub checked: Option<u32>,
    pub total: Option<u32>,
}

impl ListMetadata {
    pub fn new(id: impl Into<ListId>, title: impl Into<String>, checked: u32, total: u32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            checked: Some(checked),
            total: Some(total),
        }
    }

    /// Metadata for a list whose progress could not be read
    pub fn without_counts(id: impl Into<ListId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            checked: None,
            total: None,
        }
    }

    /// Number of movies not yet checked, if both counts are known
    pub fn unchecked(&self) -> Option<u32> {
        match (self.checked, self.total) {
            (Some(checked), Some(total)) => Some(total.saturating_sub(checked)),
            _ => None,
        }
    }
}

/// A list captured for one scan run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectableList {
    pub id: ListId,
    pub title: String,
    pub unchecked: u32,
}

impl SelectableList {
    /// Build the scan snapshot from metadata; `None` when counts are missing
    pub fn from_metadata(meta: &ListMetadata) -> Option<Self> {
        Some(Self {
            id: meta.id.clone(),
            title: meta.title.clone(),
            unchecked: meta.unchecked()?,
        })
    }
}

/// Per-list progress within a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListScanStatus {
    Pending,
    Fetching,
    Merged,
    /// Fetch or parse failed; the list contributed no movies
    Failed,
    /// Never fetched because the scan aborted early
    Skipped,
}
