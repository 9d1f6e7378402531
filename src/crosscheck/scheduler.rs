//! Scan scheduler
//!
//! Turns the selection into a fixed scan order and tracks per-list progress.
//! Lists with the fewest unchecked movies go first: in intersection mode a
//! small list shrinks the candidate set early, and an empty candidate set
//! stops the scan before the remaining pages are requested.

use tracing::warn;

use crate::domain::{
    ListId, ListMetadata, ListScanStatus, MatchMode, ScanProgress, SelectableList,
};

/// Why a selected list was left out of the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Checked/total progress could not be read from the overview page
    MissingCounts,
    /// The list no longer appears on the overview page
    NotListed,
}

/// Ordered lists for one scan run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPlan {
    pub lists: Vec<SelectableList>,
    pub excluded: Vec<(ListId, Exclusion)>,
}

impl ScanPlan {
    /// Build the plan from the selected ids and the overview metadata.
    ///
    /// Order is ascending by unchecked count; equal counts keep the order of
    /// `metadata` (page order).
    pub fn build(selected: &[ListId], metadata: &[ListMetadata]) -> Self {
        let mut lists = Vec::with_capacity(selected.len());
        let mut excluded = Vec::new();

        for meta in metadata.iter().filter(|m| selected.contains(&m.id)) {
            match SelectableList::from_metadata(meta) {
                Some(list) => lists.push(list),
                None => {
                    warn!(
                        "Excluding list '{}' ({}): progress counts missing or unreadable",
                        meta.title, meta.id
                    );
                    excluded.push((meta.id.clone(), Exclusion::MissingCounts));
                }
            }
        }

        for id in selected {
            if !metadata.iter().any(|m| &m.id == id) {
                warn!("Excluding list {}: not found on the lists page", id);
                excluded.push((id.clone(), Exclusion::NotListed));
            }
        }

        lists.sort_by_key(|l| l.unchecked);

        Self { lists, excluded }
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn titles(&self) -> Vec<String> {
        self.lists.iter().map(|l| l.title.clone()).collect()
    }
}

/// Mutable progress of one scan run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanState {
    lists: Vec<SelectableList>,
    statuses: Vec<ListScanStatus>,
    position: usize,
    in_progress: bool,
    mode: MatchMode,
    threshold: i32,
}

impl ScanState {
    pub fn new(plan: ScanPlan, mode: MatchMode, threshold: i32) -> Self {
        let statuses = vec![ListScanStatus::Pending; plan.lists.len()];
        Self {
            lists: plan.lists,
            statuses,
            position: 0,
            in_progress: true,
            mode,
            threshold,
        }
    }

    /// Next list to fetch, with its index in scan order
    pub fn next_pending(&self) -> Option<(usize, &SelectableList)> {
        if !self.in_progress {
            return None;
        }
        self.lists.get(self.position).map(|l| (self.position, l))
    }

    pub fn mark_fetching(&mut self, index: usize) {
        debug_assert_eq!(index, self.position, "lists are fetched strictly in order");
        if let Some(status) = self.statuses.get_mut(index) {
            *status = ListScanStatus::Fetching;
        }
    }

    /// Record the end of a list's merge step and advance the position
    pub fn mark_processed(&mut self, index: usize, status: ListScanStatus) {
        if index != self.position {
            return;
        }
        if let Some(slot) = self.statuses.get_mut(index) {
            *slot = status;
            self.position += 1;
        }
        if self.position >= self.lists.len() {
            self.in_progress = false;
        }
    }

    /// Stop the scan early; returns how many lists were never fetched
    pub fn abort_remaining(&mut self) -> usize {
        let mut skipped = 0;
        for status in self.statuses.iter_mut().skip(self.position) {
            if *status == ListScanStatus::Pending {
                *status = ListScanStatus::Skipped;
                skipped += 1;
            }
        }
        self.in_progress = false;
        skipped
    }

    pub fn finish(&mut self) {
        self.in_progress = false;
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn status(&self, index: usize) -> Option<ListScanStatus> {
        self.statuses.get(index).copied()
    }

    /// Titles of lists that went through a merge step, in scan order
    pub fn processed_titles(&self) -> Vec<String> {
        self.lists
            .iter()
            .zip(&self.statuses)
            .filter(|(_, s)| matches!(s, ListScanStatus::Merged | ListScanStatus::Failed))
            .map(|(l, _)| l.title.clone())
            .collect()
    }

    pub fn progress(&self) -> ScanProgress {
        ScanProgress {
            lists: self
                .lists
                .iter()
                .zip(&self.statuses)
                .map(|(l, s)| (l.id.clone(), *s))
                .collect(),
            position: self.position,
            in_progress: self.in_progress,
            mode: self.mode,
            threshold: self.threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(plan: &ScanPlan) -> Vec<&str> {
        plan.lists.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn orders_cheapest_list_first() {
        let metadata = vec![
            ListMetadata::new("/a/", "A", 0, 3),
            ListMetadata::new("/b/", "B", 0, 2),
            ListMetadata::new("/c/", "C", 9, 10),
        ];
        let selected = vec!["/a/".into(), "/b/".into(), "/c/".into()];

        let plan = ScanPlan::build(&selected, &metadata);
        assert_eq!(ids(&plan), vec!["/c/", "/b/", "/a/"]);
    }

    #[test]
    fn ties_keep_page_order_not_selection_order() {
        let metadata = vec![
            ListMetadata::new("/x/", "X", 5, 10),
            ListMetadata::new("/y/", "Y", 0, 5),
            ListMetadata::new("/z/", "Z", 1, 6),
        ];
        let selected = vec!["/z/".into(), "/y/".into(), "/x/".into()];

        let plan = ScanPlan::build(&selected, &metadata);
        assert_eq!(ids(&plan), vec!["/x/", "/y/", "/z/"]);
    }

    #[test]
    fn unreadable_and_missing_lists_are_excluded() {
        let metadata = vec![
            ListMetadata::new("/a/", "A", 1, 4),
            ListMetadata::without_counts("/b/", "B"),
        ];
        let selected = vec!["/a/".into(), "/b/".into(), "/gone/".into()];

        let plan = ScanPlan::build(&selected, &metadata);
        assert_eq!(ids(&plan), vec!["/a/"]);
        assert_eq!(
            plan.excluded,
            vec![
                (ListId::from("/b/"), Exclusion::MissingCounts),
                (ListId::from("/gone/"), Exclusion::NotListed),
            ]
        );
    }

    #[test]
    fn position_only_moves_forward() {
        let metadata = vec![ListMetadata::new("/a/", "A", 0, 1), ListMetadata::new("/b/", "B", 0, 2)];
        let plan = ScanPlan::build(&["/a/".into(), "/b/".into()], &metadata);
        let mut state = ScanState::new(plan, MatchMode::Intersection, 0);

        state.mark_fetching(0);
        state.mark_processed(0, ListScanStatus::Merged);
        // A stale completion for an earlier index must not move the position
        state.mark_processed(0, ListScanStatus::Failed);
        assert_eq!(state.position(), 1);
        assert_eq!(state.status(0), Some(ListScanStatus::Merged));

        state.mark_processed(1, ListScanStatus::Merged);
        assert_eq!(state.position(), 2);
        assert!(!state.in_progress());
        assert!(state.next_pending().is_none());
    }

    #[test]
    fn abort_marks_remaining_lists_skipped() {
        let metadata = vec![
            ListMetadata::new("/a/", "A", 0, 1),
            ListMetadata::new("/b/", "B", 0, 2),
            ListMetadata::new("/c/", "C", 0, 3),
        ];
        let plan = ScanPlan::build(&["/a/".into(), "/b/".into(), "/c/".into()], &metadata);
        let mut state = ScanState::new(plan, MatchMode::Intersection, 0);

        state.mark_processed(0, ListScanStatus::Merged);
        assert_eq!(state.abort_remaining(), 2);
        assert_eq!(state.status(2), Some(ListScanStatus::Skipped));
        assert_eq!(state.processed_titles(), vec!["A".to_string()]);
    }
}
