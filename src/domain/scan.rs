//! Scan-level types: matching policy, engine phase, results and events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::list::{ListId, ListScanStatus};
use super::movie::MovieRecord;

/// How movies from several lists are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// A movie must appear on every contributing list
    #[default]
    Intersection,
    /// A movie must appear on at least `threshold` lists
    Threshold,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Intersection => write!(f, "intersection"),
            MatchMode::Threshold => write!(f, "threshold"),
        }
    }
}

/// What a list whose fetch failed means for the merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedListPolicy {
    /// The list is left out of the merge entirely and does not count as a
    /// contributing list. Unlike `TreatAsEmpty` this does not merge an empty
    /// set, so one unreachable list cannot wipe out an intersection.
    #[default]
    Skip,
    /// The list is merged as if it had no unchecked movies, which empties an
    /// intersection and stops the scan early
    TreatAsEmpty,
}

/// Engine lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnginePhase {
    #[default]
    Idle,
    Selecting,
    Scanning,
    Done,
}

/// Final ranked output of one completed scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub scan_id: String,
    pub mode: MatchMode,
    pub threshold: i32,
    /// Titles of the lists that were actually processed, in scan order
    pub processed_lists: Vec<String>,
    /// Movies sorted by match count desc, year asc, title asc
    pub movies: Vec<MovieRecord>,
    pub completed_at: DateTime<Utc>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn urls(&self) -> Vec<&str> {
        self.movies.iter().map(|m| m.url.as_str()).collect()
    }
}

/// Result of one `start_scan` call
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Completed(ResultSet),
    /// The engine was deactivated (or a newer scan started) before completion
    Cancelled,
}

impl ScanOutcome {
    pub fn results(&self) -> Option<&ResultSet> {
        match self {
            ScanOutcome::Completed(results) => Some(results),
            ScanOutcome::Cancelled => None,
        }
    }
}

/// Progress of the current or last scan, as exposed to readers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub lists: Vec<(ListId, ListScanStatus)>,
    pub position: usize,
    pub in_progress: bool,
    pub mode: MatchMode,
    pub threshold: i32,
}

/// Events published while scanning; exactly one `ScanComplete` per completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScanEvent {
    ScanStarted {
        scan_id: String,
        /// List titles in scan order
        order: Vec<String>,
    },
    ListFetching {
        index: usize,
        total: usize,
        title: String,
    },
    ListMerged {
        index: usize,
        title: String,
        status: ListScanStatus,
        /// Unchecked movies the list contributed
        contributed: usize,
        /// Candidates left in the accumulator after the merge
        remaining: usize,
    },
    ScanAborted {
        after_index: usize,
        skipped: usize,
    },
    ScanComplete(ResultSet),
}
