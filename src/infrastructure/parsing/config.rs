//! Parsing configuration for HTML extraction
//!
//! Centralized configuration for CSS selectors and the site base URL.
//! Every selector field is a list of fallbacks, tried in order.

use serde::{Deserialize, Serialize};

/// Main parsing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Base URL for resolving relative links
    pub base_url: String,

    /// Selectors for the lists-of-lists overview page
    pub overview_selectors: OverviewSelectors,

    /// Selectors for a single list page
    pub movie_list_selectors: MovieListSelectors,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.icheckmovies.com".to_string(),
            overview_selectors: OverviewSelectors::default(),
            movie_list_selectors: MovieListSelectors::default(),
        }
    }
}

/// CSS selectors for the lists-of-lists page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverviewSelectors {
    /// One element per list
    pub list_item: Vec<String>,

    /// Link to the list page, inside a list item; its text is the title
    pub list_link: Vec<String>,

    /// Element whose text holds "checked / total"
    pub progress: Vec<String>,
}

impl Default for OverviewSelectors {
    fn default() -> Self {
        Self {
            list_item: vec![
                "ol#itemListLists > li.listItem".to_string(),
                "li.listItemList".to_string(),
                "li.listItem".to_string(),
            ],
            list_link: vec![
                "h2 > a.title".to_string(),
                "h2 a".to_string(),
                "a[href*='/lists/']".to_string(),
            ],
            progress: vec![
                "span.progress".to_string(),
                ".rank".to_string(),
                ".listProgress".to_string(),
            ],
        }
    }
}

/// CSS selectors for a list page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieListSelectors {
    /// One element per movie
    pub movie_item: Vec<String>,

    /// Link to the movie page; its text is the title
    pub title_link: Vec<String>,

    /// Element holding the release year
    pub year: Vec<String>,

    /// Class on a movie item marking it as already checked
    pub checked_class: String,

    /// Class on a movie item marking it as owned
    pub owned_class: String,
}

impl Default for MovieListSelectors {
    fn default() -> Self {
        Self {
            movie_item: vec![
                "ol#itemListMovies > li.listItem".to_string(),
                "li.listItemMovie".to_string(),
                "li.movie".to_string(),
            ],
            title_link: vec![
                "h2 > a".to_string(),
                "a.title".to_string(),
                "a[href*='/movies/']".to_string(),
            ],
            year: vec![
                "span.info a[href*='year']".to_string(),
                "span.info".to_string(),
                ".year".to_string(),
            ],
            checked_class: "checked".to_string(),
            owned_class: "owned".to_string(),
        }
    }
}
