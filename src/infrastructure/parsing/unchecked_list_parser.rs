//! List page parser
//!
//! Extracts the unchecked movies of a list page in page order. Checked
//! entries are skipped; entries without a usable link are dropped with a
//! warning. A page with no movie entries at all is treated as a layout
//! problem, while a page whose entries are all checked simply yields nothing.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::{
    ContextualParser, MovieListSelectors, ParseContext, ParsingError, ParsingResult, compile_selectors,
    normalized_text, resolve_url, select_first,
};
use crate::domain::UncheckedMovie;

static YEAR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})\b").expect("valid year regex"));

/// Parser for the movie entries of a list page
#[derive(Debug)]
pub struct UncheckedListParser {
    item_selectors: Vec<Selector>,
    title_selectors: Vec<Selector>,
    year_selectors: Vec<Selector>,
    checked_class: String,
    owned_class: String,
}

impl UncheckedListParser {
    /// Create a new parser with default selectors
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&MovieListSelectors::default())
    }

    /// Create parser with custom selector configuration
    pub fn with_config(selectors: &MovieListSelectors) -> ParsingResult<Self> {
        Ok(Self {
            item_selectors: compile_selectors("movie_item", &selectors.movie_item)?,
            title_selectors: compile_selectors("title_link", &selectors.title_link)?,
            year_selectors: compile_selectors("year", &selectors.year)?,
            checked_class: selectors.checked_class.clone(),
            owned_class: selectors.owned_class.clone(),
        })
    }

    /// Parse a raw HTML document
    pub fn parse_document(&self, html: &str, context: &ParseContext) -> ParsingResult<Vec<UncheckedMovie>> {
        let document = Html::parse_document(html);
        self.parse_with_context(&document, context)
    }

    fn extract_movie(&self, item: &ElementRef<'_>, context: &ParseContext) -> ParsingResult<UncheckedMovie> {
        let link = select_first(item, &self.title_selectors)
            .ok_or_else(|| ParsingError::required_field_missing("title_link", Some("movie entry")))?;
        let href = link
            .value()
            .attr("href")
            .ok_or_else(|| ParsingError::required_field_missing("href", Some("movie title link")))?;
        let url = resolve_url(href, &context.base_url)?;

        let mut title = normalized_text(&link);
        if title.is_empty() {
            title = link.value().attr("title").unwrap_or_default().trim().to_string();
        }

        let year = select_first(item, &self.year_selectors)
            .map(|e| normalized_text(&e))
            .map(|text| {
                YEAR_PATTERN
                    .captures(&text)
                    .and_then(|c| c.get(1))
                    .map_or(text.clone(), |m| m.as_str().to_string())
            })
            .unwrap_or_default();

        let owned = has_class(item, &self.owned_class);
        Ok(UncheckedMovie { url, title, year, owned })
    }
}

impl ContextualParser for UncheckedListParser {
    type Output = Vec<UncheckedMovie>;
    type Context = ParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        let root = html.root_element();
        let mut tried = Vec::new();

        for (i, selector) in self.item_selectors.iter().enumerate() {
            tried.push(format!("movie_item_{i}"));
            let items: Vec<ElementRef<'_>> = root.select(selector).collect();
            if items.is_empty() {
                continue;
            }

            let mut movies = Vec::new();
            let mut checked = 0usize;
            for (index, item) in items.iter().enumerate() {
                if has_class(item, &self.checked_class) {
                    checked += 1;
                    continue;
                }
                match self.extract_movie(item, context) {
                    Ok(movie) => movies.push(movie),
                    Err(e) if e.is_recoverable() => {
                        warn!("Skipping movie entry {} on {}: {}", index, context.page_url, e);
                    }
                    Err(e) => return Err(e),
                }
            }

            debug!(
                "Parsed {} entries on {} ({} unchecked, {} checked)",
                items.len(),
                context.page_url,
                movies.len(),
                checked
            );
            return Ok(movies);
        }

        Err(ParsingError::no_entries_found(&context.page_url, tried))
    }
}

fn has_class(element: &ElementRef<'_>, class: &str) -> bool {
    !class.is_empty() && element.value().classes().any(|c| c == class)
}
