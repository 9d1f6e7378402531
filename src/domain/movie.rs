//! Movie entries scraped from list pages and the records accumulated across lists

use serde::{Deserialize, Serialize};
use std::fmt;

/// One unchecked movie as scraped from a list page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncheckedMovie {
    /// Movie page URL; the only stable identity (title + year is not unique)
    pub url: String,
    pub title: String,
    /// Release year as shown on the page, usually four digits; empty if absent
    pub year: String,
    pub owned: bool,
}

impl UncheckedMovie {
    pub fn new(url: impl Into<String>, title: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            year: year.into(),
            owned: false,
        }
    }

    pub fn with_owned(mut self, owned: bool) -> Self {
        self.owned = owned;
        self
    }
}

/// A movie tracked by the accumulator, with the number of lists it appeared on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub url: String,
    pub title: String,
    pub year: String,
    pub match_count: u32,
    pub owned: bool,
}

impl MovieRecord {
    /// First sighting of a movie
    pub fn first_seen(movie: UncheckedMovie) -> Self {
        Self {
            url: movie.url,
            title: movie.title,
            year: movie.year,
            match_count: 1,
            owned: movie.owned,
        }
    }
}

impl fmt::Display for MovieRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.year.is_empty() {
            write!(f, "{} [{}]", self.title, self.match_count)
        } else {
            write!(f, "{} ({}) [{}]", self.title, self.year, self.match_count)
        }
    }
}
