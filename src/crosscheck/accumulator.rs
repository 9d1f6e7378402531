//! Accumulator for movies seen across the lists of a scan
//!
//! Movies are keyed by URL. Records keep their first-seen order, which the
//! ranker's stable sort uses as the last tiebreak.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::domain::{MatchMode, MovieRecord, UncheckedMovie};

/// Summary of one merge step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Distinct movies the list contributed
    pub contributed: usize,
    /// Movies already present whose count went up
    pub matched: usize,
    /// New records created
    pub inserted: usize,
    /// Records removed by the intersection prune
    pub pruned: usize,
    /// Records left after the merge
    pub remaining: usize,
    /// Intersection mode found no candidates left after a list beyond the first
    pub exhausted: bool,
}

#[derive(Debug, Clone)]
pub struct Accumulator {
    mode: MatchMode,
    threshold: i32,
    records: Vec<MovieRecord>,
    by_url: HashMap<String, usize>,
}

impl Accumulator {
    pub fn new(mode: MatchMode, threshold: i32) -> Self {
        Self {
            mode,
            threshold,
            records: Vec::new(),
            by_url: HashMap::new(),
        }
    }

    /// Merge the unchecked movies of the list at `list_index` (0-based among
    /// contributing lists).
    ///
    /// In intersection mode only the first list may create records, and after
    /// any later list every record that did not appear on it is pruned.
    pub fn merge_list(&mut self, movies: Vec<UncheckedMovie>, list_index: usize) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        let mut seen_in_list = HashSet::with_capacity(movies.len());

        for movie in movies {
            if !seen_in_list.insert(movie.url.clone()) {
                continue;
            }
            outcome.contributed += 1;

            if let Some(&pos) = self.by_url.get(&movie.url) {
                let record = &mut self.records[pos];
                record.match_count += 1;
                record.owned |= movie.owned;
                outcome.matched += 1;
                continue;
            }

            let insert = match self.mode {
                MatchMode::Intersection => list_index == 0,
                MatchMode::Threshold => true,
            };
            if insert {
                self.by_url.insert(movie.url.clone(), self.records.len());
                self.records.push(MovieRecord::first_seen(movie));
                outcome.inserted += 1;
            }
        }

        if self.mode == MatchMode::Intersection && list_index > 0 {
            let required = u32::try_from(list_index + 1).unwrap_or(u32::MAX);
            outcome.pruned = self.retain(|r| r.match_count == required);
            outcome.exhausted = self.records.is_empty();
        }

        outcome.remaining = self.records.len();
        debug!(
            "Merged list #{}: contributed={}, matched={}, inserted={}, pruned={}, remaining={}",
            list_index, outcome.contributed, outcome.matched, outcome.inserted, outcome.pruned, outcome.remaining
        );
        outcome
    }

    /// Apply the final threshold (threshold mode only) and hand back the records.
    ///
    /// A threshold of zero or below keeps everything ever seen.
    pub fn finalize(mut self) -> Vec<MovieRecord> {
        if self.mode == MatchMode::Threshold && self.threshold > 0 {
            let threshold = self.threshold.unsigned_abs();
            let pruned = self.retain(|r| r.match_count >= threshold);
            debug!("Threshold {} pruned {} records", threshold, pruned);
        }
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[MovieRecord] {
        &self.records
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    fn retain(&mut self, keep: impl Fn(&MovieRecord) -> bool) -> usize {
        let before = self.records.len();
        self.records.retain(|r| keep(r));
        if self.records.len() != before {
            self.by_url = self
                .records
                .iter()
                .enumerate()
                .map(|(pos, r)| (r.url.clone(), pos))
                .collect();
        }
        before - self.records.len()
    }
}
