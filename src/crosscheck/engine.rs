//! Cross-reference engine state machine
//!
//! ```text
//! Idle --activate--> Selecting --toggle--> Selecting
//! Selecting --start_scan (>= 2 lists)--> Scanning --all merged | early abort--> Done
//! Done --acknowledge_results--> Idle
//! Done --activate--> Selecting (selection kept for a rescan)
//! any --deactivate--> Idle (full reset)
//! ```
//!
//! Lists are fetched one at a time. Every run gets a generation number and a
//! cancellation token; `deactivate` cancels the token and bumps the
//! generation, so a response that still arrives afterwards is dropped instead
//! of touching newer state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::accumulator::Accumulator;
use super::ranker::rank;
use super::scheduler::{ScanPlan, ScanState};
use super::selection::{Selection, ToggleOutcome};
use super::{EngineError, FetchError, ListSource};
use crate::domain::{
    EnginePhase, FailedListPolicy, ListId, ListScanStatus, MatchMode, ResultSet, ScanEvent,
    ScanOutcome, ScanProgress, UncheckedMovie,
};

/// Engine behaviour knobs, usually built from the `crosscheck` config section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossCheckSettings {
    pub mode: MatchMode,
    /// Minimum number of lists a movie must appear on (threshold mode only)
    pub threshold: i32,
    /// Upper bound for one fetch (overview or list), retries included
    pub fetch_timeout: Duration,
    pub failed_list_policy: FailedListPolicy,
    /// Buffer size of the event channel
    pub event_capacity: usize,
}

impl Default for CrossCheckSettings {
    fn default() -> Self {
        Self {
            mode: MatchMode::Intersection,
            threshold: 2,
            fetch_timeout: Duration::from_secs(30),
            failed_list_policy: FailedListPolicy::Skip,
            event_capacity: 64,
        }
    }
}

/// Read-only view of the engine, comparable across instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub phase: EnginePhase,
    pub selection: Vec<ListId>,
    pub scan: Option<ScanProgress>,
    pub results: Option<ResultSet>,
}

#[derive(Debug, Default)]
struct EngineInner {
    phase: EnginePhase,
    selection: Selection,
    scan: Option<ScanState>,
    results: Option<ResultSet>,
    generation: u64,
    cancel: Option<CancellationToken>,
}

impl EngineInner {
    fn reset(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.generation = self.generation.wrapping_add(1);
        self.phase = EnginePhase::Idle;
        self.selection.clear();
        self.scan = None;
        self.results = None;
    }
}

/// Handle to one cross-reference engine. Clones share the same state.
#[derive(Clone)]
pub struct CrossCheckEngine {
    source: Arc<dyn ListSource>,
    settings: CrossCheckSettings,
    inner: Arc<Mutex<EngineInner>>,
    events: broadcast::Sender<ScanEvent>,
}

impl std::fmt::Debug for CrossCheckEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossCheckEngine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl CrossCheckEngine {
    pub fn new(source: Arc<dyn ListSource>, settings: CrossCheckSettings) -> Self {
        let (events, _) = broadcast::channel(settings.event_capacity.max(1));
        Self {
            source,
            settings,
            inner: Arc::new(Mutex::new(EngineInner::default())),
            events,
        }
    }

    pub fn settings(&self) -> &CrossCheckSettings {
        &self.settings
    }

    /// Receive progress events and the terminal `ScanComplete`
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events.subscribe()
    }

    /// Enter selection mode. Has no effect while a scan is running.
    pub async fn activate(&self) -> EnginePhase {
        let mut inner = self.inner.lock().await;
        if matches!(inner.phase, EnginePhase::Idle | EnginePhase::Done) {
            inner.phase = EnginePhase::Selecting;
            debug!("Cross-check activated");
        }
        inner.phase
    }

    /// Toggle a list in or out of the selection; ignored unless selecting
    pub async fn toggle_selection(&self, id: impl Into<ListId>) -> ToggleOutcome {
        let id = id.into();
        let mut inner = self.inner.lock().await;
        if inner.phase != EnginePhase::Selecting {
            debug!("Ignoring toggle of {} in phase {:?}", id, inner.phase);
            return ToggleOutcome::Ignored;
        }
        inner.selection.toggle(id)
    }

    /// Whether the scan trigger should be enabled in the UI
    pub async fn scan_enabled(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.phase == EnginePhase::Selecting && inner.selection.scan_enabled()
    }

    pub async fn phase(&self) -> EnginePhase {
        self.inner.lock().await.phase
    }

    pub async fn selection(&self) -> Vec<ListId> {
        self.inner.lock().await.selection.ids().to_vec()
    }

    /// Results of the last completed scan, if it has not been reset since
    pub async fn last_results(&self) -> Option<ResultSet> {
        self.inner.lock().await.results.clone()
    }

    /// Leave `Done` once the results have been shown. Results and selection are kept.
    pub async fn acknowledge_results(&self) -> Option<ResultSet> {
        let mut inner = self.inner.lock().await;
        if inner.phase != EnginePhase::Done {
            return None;
        }
        inner.phase = EnginePhase::Idle;
        inner.results.clone()
    }

    pub async fn snapshot(&self) -> EngineSnapshot {
        let inner = self.inner.lock().await;
        EngineSnapshot {
            phase: inner.phase,
            selection: inner.selection.ids().to_vec(),
            scan: inner.scan.as_ref().map(ScanState::progress),
            results: inner.results.clone(),
        }
    }

    /// Reset to a clean `Idle` state. Always legal; an in-flight fetch is abandoned.
    pub async fn deactivate(&self) {
        let mut inner = self.inner.lock().await;
        let was_scanning = inner.phase == EnginePhase::Scanning;
        inner.reset();
        if was_scanning {
            info!("🛑 Cross-check deactivated during scan; pending fetch discarded");
        } else {
            debug!("Cross-check deactivated");
        }
    }

    /// Run one scan over the current selection.
    ///
    /// Returns `Cancelled` if the engine is deactivated before the scan
    /// finishes. Fetch failures never fail the scan.
    pub async fn start_scan(&self) -> Result<ScanOutcome, EngineError> {
        let (generation, token, selected) = {
            let mut inner = self.inner.lock().await;
            if inner.phase != EnginePhase::Selecting {
                return Err(EngineError::NotSelecting(inner.phase));
            }
            if !inner.selection.scan_enabled() {
                return Err(EngineError::NotEnoughLists {
                    selected: inner.selection.len(),
                });
            }
            inner.generation = inner.generation.wrapping_add(1);
            let token = CancellationToken::new();
            inner.cancel = Some(token.clone());
            inner.phase = EnginePhase::Scanning;
            inner.scan = None;
            inner.results = None;
            (inner.generation, token, inner.selection.ids().to_vec())
        };

        let scan_id = Uuid::new_v4().to_string();
        let mode = self.settings.mode;
        let threshold = self.settings.threshold;
        info!(
            "🔍 Starting cross-check {} over {} lists (mode: {}, threshold: {})",
            scan_id,
            selected.len(),
            mode,
            threshold
        );

        let overview = tokio::time::timeout(self.settings.fetch_timeout, self.source.list_metadata());
        let Some(metadata) = cancellable(&token, overview).await else {
            return Ok(ScanOutcome::Cancelled);
        };
        let metadata = metadata
            .unwrap_or_else(|_| Err(self.timeout_error()))
            .unwrap_or_else(|e| {
                warn!("Failed to read list metadata, no list can be scheduled: {}", e);
                Vec::new()
            });

        let plan = ScanPlan::build(&selected, &metadata);
        let order = plan.titles();
        {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                return Ok(ScanOutcome::Cancelled);
            }
            inner.scan = Some(ScanState::new(plan, mode, threshold));
        }
        info!("Scan order: {}", order.join(" → "));
        self.emit(ScanEvent::ScanStarted {
            scan_id: scan_id.clone(),
            order,
        });

        let mut accumulator = Accumulator::new(mode, threshold);
        let mut contributing = 0usize;

        loop {
            let (index, total, list) = {
                let mut inner = self.inner.lock().await;
                if inner.generation != generation {
                    return Ok(ScanOutcome::Cancelled);
                }
                let Some(scan) = inner.scan.as_mut() else {
                    return Ok(ScanOutcome::Cancelled);
                };
                let Some((index, list)) = scan.next_pending() else {
                    break;
                };
                let list = list.clone();
                scan.mark_fetching(index);
                (index, scan.len(), list)
            };

            debug!("Fetching list {}/{}: {} ({} unchecked)", index + 1, total, list.title, list.unchecked);
            self.emit(ScanEvent::ListFetching {
                index,
                total,
                title: list.title.clone(),
            });

            let fetch = tokio::time::timeout(self.settings.fetch_timeout, self.source.fetch_unchecked(&list));
            let Some(fetched) = cancellable(&token, fetch).await else {
                debug!("Fetch of {} abandoned after cancellation", list.id);
                return Ok(ScanOutcome::Cancelled);
            };
            let fetched = fetched.unwrap_or_else(|_| Err(self.timeout_error()));

            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                debug!("Discarding stale response for {}", list.id);
                return Ok(ScanOutcome::Cancelled);
            }
            let Some(scan) = inner.scan.as_mut() else {
                return Ok(ScanOutcome::Cancelled);
            };

            let (status, movies): (ListScanStatus, Option<Vec<UncheckedMovie>>) = match fetched {
                Ok(movies) => (ListScanStatus::Merged, Some(movies)),
                Err(e) => {
                    warn!("⚠️ List '{}' failed, continuing without it: {}", list.title, e);
                    let movies = match self.settings.failed_list_policy {
                        FailedListPolicy::TreatAsEmpty => Some(Vec::new()),
                        FailedListPolicy::Skip => None,
                    };
                    (ListScanStatus::Failed, movies)
                }
            };

            let outcome = movies.map(|movies| {
                let outcome = accumulator.merge_list(movies, contributing);
                contributing += 1;
                outcome
            });
            scan.mark_processed(index, status);

            self.emit(ScanEvent::ListMerged {
                index,
                title: list.title.clone(),
                status,
                contributed: outcome.map_or(0, |o| o.contributed),
                remaining: accumulator.len(),
            });

            if outcome.is_some_and(|o| o.exhausted) && scan.in_progress() {
                let skipped = scan.abort_remaining();
                info!(
                    "No candidates left after '{}'; skipping {} remaining lists",
                    list.title, skipped
                );
                self.emit(ScanEvent::ScanAborted {
                    after_index: index,
                    skipped,
                });
                break;
            }
        }

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            return Ok(ScanOutcome::Cancelled);
        }

        let movies = rank(accumulator.finalize());
        let processed_lists = match inner.scan.as_mut() {
            Some(scan) => {
                scan.finish();
                scan.processed_titles()
            }
            None => Vec::new(),
        };
        let results = ResultSet {
            scan_id,
            mode,
            threshold,
            processed_lists,
            movies,
            completed_at: Utc::now(),
        };

        inner.phase = EnginePhase::Done;
        inner.results = Some(results.clone());
        inner.cancel = None;
        info!("✅ Cross-check {} complete: {} movies found", results.scan_id, results.len());
        self.emit(ScanEvent::ScanComplete(results.clone()));
        Ok(ScanOutcome::Completed(results))
    }

    fn timeout_error(&self) -> FetchError {
        FetchError::Timeout {
            seconds: self.settings.fetch_timeout.as_secs(),
        }
    }

    fn emit(&self, event: ScanEvent) {
        if self.events.send(event).is_err() {
            debug!("No scan event subscribers");
        }
    }
}

/// Await `fut` unless `token` is cancelled first; `None` means cancelled
async fn cancellable<F: Future>(token: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        () = token.cancelled() => None,
        out = fut => Some(out),
    }
}
