//! End-to-end scans of the cross-check engine against an in-memory list source

use async_trait::async_trait;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use list_crosscheck::crosscheck::{
    CrossCheckEngine, CrossCheckSettings, FetchError, ListSource, ToggleOutcome,
};
use list_crosscheck::domain::{
    EnginePhase, FailedListPolicy, ListMetadata, ListScanStatus, MatchMode, ScanEvent, ScanOutcome,
    SelectableList, UncheckedMovie,
};

/// Pauses the fetch of one list until released
struct Hold {
    list: String,
    started: Arc<Notify>,
    release: Arc<Notify>,
}

#[derive(Default)]
struct MockSource {
    metadata: Vec<ListMetadata>,
    metadata_error: Option<FetchError>,
    metadata_delay: Option<Duration>,
    pages: HashMap<String, Result<Vec<UncheckedMovie>, FetchError>>,
    delays: HashMap<String, Duration>,
    hold: Option<Hold>,
    fetched: Mutex<Vec<String>>,
}

impl MockSource {
    fn with_list(mut self, id: &str, movies: &[&str]) -> Self {
        let unchecked = u32::try_from(movies.len()).unwrap();
        self.metadata.push(ListMetadata::new(id, id.to_uppercase(), 0, unchecked));
        self.pages.insert(id.to_string(), Ok(movies.iter().map(|m| movie(m)).collect()));
        self
    }

    fn failing(mut self, id: &str, error: FetchError) -> Self {
        self.pages.insert(id.to_string(), Err(error));
        self
    }

    fn slow(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListSource for MockSource {
    async fn list_metadata(&self) -> Result<Vec<ListMetadata>, FetchError> {
        if let Some(delay) = self.metadata_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.metadata_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.metadata.clone()),
        }
    }

    async fn fetch_unchecked(&self, list: &SelectableList) -> Result<Vec<UncheckedMovie>, FetchError> {
        let id = list.id.as_str().to_string();
        self.fetched.lock().unwrap().push(id.clone());

        if let Some(hold) = self.hold.as_ref().filter(|h| h.list == id) {
            hold.started.notify_one();
            hold.release.notified().await;
        }
        if let Some(delay) = self.delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }
        self.pages
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::HttpStatus { status: 404, url: id }))
    }
}

fn movie(id: &str) -> UncheckedMovie {
    let year = match id {
        "m1" => "1990",
        "m2" => "2000",
        _ => "2010",
    };
    UncheckedMovie::new(id, id.to_uppercase(), year)
}

/// A = {m1, m2, m3}, B = {m2, m3}, C = {m3}
fn abc_source() -> MockSource {
    MockSource::default()
        .with_list("a", &["m1", "m2", "m3"])
        .with_list("b", &["m2", "m3"])
        .with_list("c", &["m3"])
}

async fn scan(source: Arc<MockSource>, settings: CrossCheckSettings, lists: &[&str]) -> (ScanOutcome, Vec<ScanEvent>) {
    let engine = CrossCheckEngine::new(source, settings);
    let mut rx = engine.subscribe();
    engine.activate().await;
    for id in lists {
        assert_eq!(engine.toggle_selection(*id).await, ToggleOutcome::Selected);
    }
    let outcome = engine.start_scan().await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    (outcome, events)
}

fn threshold_settings(threshold: i32) -> CrossCheckSettings {
    CrossCheckSettings {
        mode: MatchMode::Threshold,
        threshold,
        ..CrossCheckSettings::default()
    }
}

#[tokio::test]
async fn intersection_scans_smallest_list_first() {
    let (outcome, events) = scan(Arc::new(abc_source()), CrossCheckSettings::default(), &["a", "b", "c"]).await;

    let results = outcome.results().unwrap();
    assert_eq!(results.urls(), vec!["m3"]);
    assert_eq!(results.processed_lists, vec!["C", "B", "A"]);
    assert_eq!(results.movies[0].match_count, 3);

    let Some(ScanEvent::ScanStarted { order, .. }) = events.first() else {
        panic!("first event should be ScanStarted, got {:?}", events.first());
    };
    assert_eq!(order, &vec!["C".to_string(), "B".to_string(), "A".to_string()]);
    assert!(matches!(events.last(), Some(ScanEvent::ScanComplete(_))));
}

#[tokio::test]
async fn threshold_two_keeps_movies_on_two_lists() {
    let (outcome, _) = scan(Arc::new(abc_source()), threshold_settings(2), &["a", "b", "c"]).await;
    let results = outcome.results().unwrap();

    assert_eq!(results.urls(), vec!["m3", "m2"]);
    assert!(results.movies.iter().all(|m| m.match_count >= 2));
}

#[tokio::test]
async fn non_positive_threshold_yields_the_union() {
    for threshold in [0, -1] {
        let (outcome, _) = scan(Arc::new(abc_source()), threshold_settings(threshold), &["a", "b", "c"]).await;
        assert_eq!(outcome.results().unwrap().urls(), vec!["m3", "m2", "m1"]);
    }
}

#[tokio::test]
async fn failed_list_is_skipped_by_default() {
    let source = Arc::new(abc_source().failing("b", FetchError::Network("connection reset".into())));
    let (outcome, events) = scan(source, CrossCheckSettings::default(), &["a", "b", "c"]).await;

    let results = outcome.results().unwrap();
    assert_eq!(results.urls(), vec!["m3"]);
    assert_eq!(results.movies[0].match_count, 2);
    assert_eq!(results.processed_lists, vec!["C", "B", "A"]);

    assert!(events.iter().any(|e| matches!(
        e,
        ScanEvent::ListMerged { title, status: ListScanStatus::Failed, contributed: 0, .. } if title == "B"
    )));
}

#[tokio::test]
async fn failed_list_treated_as_empty_empties_the_intersection() {
    let source = Arc::new(abc_source().failing("b", FetchError::Network("connection reset".into())));
    let settings = CrossCheckSettings {
        failed_list_policy: FailedListPolicy::TreatAsEmpty,
        ..CrossCheckSettings::default()
    };
    let (outcome, events) = scan(source.clone(), settings, &["a", "b", "c"]).await;

    assert!(outcome.results().unwrap().is_empty());
    assert_eq!(source.fetched(), vec!["c", "b"]);
    assert!(events.iter().any(|e| matches!(e, ScanEvent::ScanAborted { after_index: 1, skipped: 1 })));
}

#[tokio::test]
async fn disjoint_lists_stop_the_scan_early() {
    let source = Arc::new(
        MockSource::default()
            .with_list("x", &["m1"])
            .with_list("y", &["m2"])
            .with_list("z", &["m1", "m2", "m3", "m4", "m5"]),
    );
    let engine = CrossCheckEngine::new(source.clone(), CrossCheckSettings::default());
    engine.activate().await;
    for id in ["x", "y", "z"] {
        engine.toggle_selection(id).await;
    }

    let outcome = engine.start_scan().await.unwrap();

    assert!(outcome.results().unwrap().is_empty());
    assert_eq!(source.fetched(), vec!["x", "y"]);
    let progress = engine.snapshot().await.scan.unwrap();
    assert_eq!(progress.lists[2].1, ListScanStatus::Skipped);
    assert_eq!(outcome.results().unwrap().processed_lists, vec!["X", "Y"]);
}

#[tokio::test]
async fn threshold_mode_never_stops_early() {
    let source = Arc::new(
        MockSource::default()
            .with_list("x", &["m1"])
            .with_list("y", &["m2"])
            .with_list("z", &["m1", "m2", "m3"]),
    );
    let (outcome, _) = scan(source.clone(), threshold_settings(2), &["x", "y", "z"]).await;

    assert_eq!(source.fetched().len(), 3);
    assert_eq!(outcome.results().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn slow_list_times_out_and_counts_as_failed() {
    let source = Arc::new(abc_source().slow("b", Duration::from_secs(600)));
    let settings = CrossCheckSettings {
        fetch_timeout: Duration::from_millis(50),
        ..CrossCheckSettings::default()
    };
    let (outcome, events) = scan(source, settings, &["a", "b", "c"]).await;

    assert_eq!(outcome.results().unwrap().urls(), vec!["m3"]);
    assert!(events.iter().any(|e| matches!(
        e,
        ScanEvent::ListMerged { status: ListScanStatus::Failed, title, .. } if title == "B"
    )));
}

#[tokio::test]
async fn unreadable_or_missing_lists_are_left_out() {
    let mut source = abc_source();
    source.metadata.push(ListMetadata::without_counts("d", "D"));
    let (outcome, _) = scan(Arc::new(source), CrossCheckSettings::default(), &["a", "c", "d", "gone"]).await;

    let results = outcome.results().unwrap();
    assert_eq!(results.processed_lists, vec!["C", "A"]);
    assert_eq!(results.urls(), vec!["m3"]);
}

#[tokio::test(start_paused = true)]
async fn hanging_overview_times_out_with_empty_results() {
    let mut source = abc_source();
    source.metadata_delay = Some(Duration::from_secs(100_000));
    let source = Arc::new(source);
    let settings = CrossCheckSettings {
        fetch_timeout: Duration::from_secs(1),
        ..CrossCheckSettings::default()
    };

    let start = tokio::time::Instant::now();
    let (outcome, events) = scan(source.clone(), settings, &["a", "b", "c"]).await;

    assert!(start.elapsed() < Duration::from_secs(10), "overview fetch took {:?}", start.elapsed());
    let results = outcome.results().unwrap();
    assert!(results.is_empty());
    assert!(results.processed_lists.is_empty());
    assert!(source.fetched().is_empty());
    assert!(matches!(events.last(), Some(ScanEvent::ScanComplete(_))));
}

#[tokio::test]
async fn failed_overview_completes_with_empty_results() {
    let mut source = abc_source();
    source.metadata_error = Some(FetchError::HttpStatus {
        status: 503,
        url: "https://example.com/lists/".into(),
    });
    let source = Arc::new(source);

    let (outcome, events) = scan(source.clone(), CrossCheckSettings::default(), &["a", "b"]).await;

    assert!(outcome.results().unwrap().is_empty());
    assert!(source.fetched().is_empty());
    let complete = events.iter().filter(|e| matches!(e, ScanEvent::ScanComplete(_))).count();
    assert_eq!(complete, 1);
}

fn held_source(list: &str) -> (MockSource, Arc<Notify>, Arc<Notify>) {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let mut source = abc_source();
    source.hold = Some(Hold {
        list: list.to_string(),
        started: started.clone(),
        release: release.clone(),
    });
    (source, started, release)
}

#[tokio::test]
async fn deactivate_during_fetch_cancels_without_results() {
    let (source, started, _release) = held_source("b");
    let engine = CrossCheckEngine::new(Arc::new(source), CrossCheckSettings::default());
    let mut rx = engine.subscribe();
    engine.activate().await;
    for id in ["a", "b", "c"] {
        engine.toggle_selection(id).await;
    }

    let scanning = engine.clone();
    let handle = tokio::spawn(async move { scanning.start_scan().await });
    started.notified().await;
    assert_eq!(engine.phase().await, EnginePhase::Scanning);

    engine.deactivate().await;
    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome, ScanOutcome::Cancelled);

    while let Ok(event) = rx.try_recv() {
        assert!(!matches!(event, ScanEvent::ScanComplete(_)), "cancelled scan published results");
    }
    let fresh = CrossCheckEngine::new(Arc::new(abc_source()), CrossCheckSettings::default());
    assert_eq!(engine.snapshot().await, fresh.snapshot().await);
}

#[tokio::test]
async fn toggles_during_scan_are_ignored() {
    let (source, started, release) = held_source("b");
    let engine = CrossCheckEngine::new(Arc::new(source), CrossCheckSettings::default());
    engine.activate().await;
    for id in ["a", "b", "c"] {
        engine.toggle_selection(id).await;
    }

    let scanning = engine.clone();
    let handle = tokio::spawn(async move { scanning.start_scan().await });
    started.notified().await;

    assert_eq!(engine.toggle_selection("a").await, ToggleOutcome::Ignored);
    assert_eq!(engine.activate().await, EnginePhase::Scanning);
    assert_eq!(engine.selection().await.len(), 3);

    release.notify_one();
    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome.results().unwrap().urls(), vec!["m3"]);
    assert_eq!(engine.phase().await, EnginePhase::Done);
}

#[tokio::test]
async fn engine_can_scan_again_after_completion() {
    let engine = CrossCheckEngine::new(Arc::new(abc_source()), CrossCheckSettings::default());
    engine.activate().await;
    engine.toggle_selection("a").await;
    engine.toggle_selection("b").await;
    let first = engine.start_scan().await.unwrap();
    // Equal counts fall back to year order
    assert_eq!(first.results().unwrap().urls(), vec!["m2", "m3"]);

    assert_eq!(engine.activate().await, EnginePhase::Selecting);
    engine.toggle_selection("c").await;
    let second = engine.start_scan().await.unwrap();
    assert_eq!(second.results().unwrap().urls(), vec!["m3"]);
    assert_ne!(first.results().unwrap().scan_id, second.results().unwrap().scan_id);
}

fn list_strategy() -> impl Strategy<Value = Vec<BTreeSet<u8>>> {
    prop::collection::vec(prop::collection::btree_set(0u8..10, 0..8), 2..5)
}

fn run_scan(lists: &[BTreeSet<u8>], settings: CrossCheckSettings) -> Vec<String> {
    let mut source = MockSource::default();
    let mut ids = Vec::new();
    for (i, list) in lists.iter().enumerate() {
        let id = format!("l{i}");
        let movies: Vec<String> = list.iter().map(|m| format!("m{m}")).collect();
        let refs: Vec<&str> = movies.iter().map(String::as_str).collect();
        source = source.with_list(&id, &refs);
        ids.push(id);
    }

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    runtime.block_on(async {
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let (outcome, _) = scan(Arc::new(source), settings, &id_refs).await;
        outcome.results().unwrap().urls().into_iter().map(str::to_string).collect()
    })
}

proptest! {
    #[test]
    fn intersection_is_exactly_the_common_movies(lists in list_strategy()) {
        let result: BTreeSet<String> = run_scan(&lists, CrossCheckSettings::default()).into_iter().collect();

        let mut common = lists[0].clone();
        for list in &lists[1..] {
            common = common.intersection(list).copied().collect();
        }
        let expected: BTreeSet<String> = common.iter().map(|m| format!("m{m}")).collect();
        prop_assert_eq!(result, expected);
    }

    #[test]
    fn threshold_keeps_movies_seen_often_enough(lists in list_strategy(), threshold in 1i32..4) {
        let result: BTreeSet<String> = run_scan(&lists, threshold_settings(threshold)).into_iter().collect();

        let mut counts: HashMap<u8, i32> = HashMap::new();
        for list in &lists {
            for m in list {
                *counts.entry(*m).or_default() += 1;
            }
        }
        let expected: BTreeSet<String> = counts
            .iter()
            .filter(|(_, c)| **c >= threshold)
            .map(|(m, _)| format!("m{m}"))
            .collect();
        prop_assert_eq!(result, expected);
    }
}
