//! Domain module - Core data types of the cross-reference engine
//!
//! Plain values shared by the engine, the infrastructure layer and consumers
//! of published results. Nothing here performs I/O.

pub mod list;
pub mod movie;
pub mod scan;

// Re-export commonly used items
pub use list::{ListId, ListMetadata, ListScanStatus, SelectableList};
pub use movie::{MovieRecord, UncheckedMovie};
pub use scan::{
    EnginePhase, FailedListPolicy, MatchMode, ResultSet, ScanEvent, ScanOutcome, ScanProgress,
};
