//! Selection tracker
//!
//! Keeps the lists the user marked for comparison in the order they were
//! selected. Whether a toggle is honoured depends on the engine phase, which
//! the engine checks before calling in here.

use serde::{Deserialize, Serialize};

use crate::domain::ListId;

/// Minimum number of selected lists for a scan
pub const MIN_SELECTED_LISTS: usize = 2;

/// Effect of a toggle request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToggleOutcome {
    Selected,
    Deselected,
    /// The engine was not accepting selection changes
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    lists: Vec<ListId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, id: ListId) -> ToggleOutcome {
        if let Some(pos) = self.lists.iter().position(|l| *l == id) {
            self.lists.remove(pos);
            ToggleOutcome::Deselected
        } else {
            self.lists.push(id);
            ToggleOutcome::Selected
        }
    }

    pub fn contains(&self, id: &ListId) -> bool {
        self.lists.contains(id)
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// True when enough lists are selected to run a scan
    pub fn scan_enabled(&self) -> bool {
        self.lists.len() >= MIN_SELECTED_LISTS
    }

    pub fn ids(&self) -> &[ListId] {
        &self.lists
    }

    pub fn clear(&mut self) {
        self.lists.clear();
    }
}
