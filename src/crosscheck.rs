//! # List Cross-Reference Engine
//!
//! Sequentially scans a user's selection of lists and combines their unchecked
//! movies, either keeping only movies present on every list (intersection) or
//! movies present on at least N lists (threshold).
//!
//! - `selection`: which lists the user marked for comparison
//! - `scheduler`: cheapest-first scan plan and per-list progress
//! - `accumulator`: running movie set and match counts
//! - `ranker`: deterministic ordering of the final results
//! - `engine`: the state machine tying them together

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ListMetadata, SelectableList, UncheckedMovie};

pub mod accumulator;
pub mod engine;
pub mod ranker;
pub mod scheduler;
pub mod selection;

pub use accumulator::{Accumulator, MergeOutcome};
pub use engine::{CrossCheckEngine, CrossCheckSettings, EngineSnapshot};
pub use ranker::rank;
pub use scheduler::{ScanPlan, ScanState};
pub use selection::{Selection, ToggleOutcome};

/// Why a list could not be fetched. Never fatal to a scan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error {status}: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Fetch timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Rejected engine calls. These are usage errors, reported instead of panicking.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Engine is not accepting a scan in phase {0:?}")]
    NotSelecting(crate::domain::EnginePhase),

    #[error("At least 2 lists must be selected, got {selected}")]
    NotEnoughLists { selected: usize },
}

/// Where list data comes from: the overview page and individual list pages.
///
/// Implementations may do network I/O; the engine never calls either method
/// concurrently with another call on the same engine.
#[async_trait]
pub trait ListSource: Send + Sync {
    /// Read every list shown on the lists-of-lists page, in page order
    async fn list_metadata(&self) -> Result<Vec<ListMetadata>, FetchError>;

    /// Fetch the unchecked movies of one list, in page order
    async fn fetch_unchecked(&self, list: &SelectableList) -> Result<Vec<UncheckedMovie>, FetchError>;
}
