//! Lists-of-lists overview parser
//!
//! Reads every list on the overview page with its title and checked/total
//! progress. A list whose progress cannot be read is still returned, without
//! counts, so the scheduler can report why it was left out.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::{
    ContextualParser, OverviewSelectors, ParseContext, ParsingError, ParsingResult, compile_selectors,
    normalized_text, resolve_url, select_first,
};
use crate::domain::{ListId, ListMetadata};

static PROGRESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d[\d,.]*)\s*(?:/|of)\s*(\d[\d,.]*)").expect("valid progress regex"));

/// Parse "checked / total" progress text such as `"12 / 250"` or `"1,024 of 1,500"`
pub fn parse_progress(text: &str) -> ParsingResult<(u32, u32)> {
    let unreadable = || ParsingError::ProgressUnreadable { text: text.to_string() };
    let caps = PROGRESS_PATTERN.captures(text).ok_or_else(unreadable)?;

    let number = |i: usize| -> ParsingResult<u32> {
        caps.get(i)
            .map(|m| m.as_str().replace([',', '.'], ""))
            .and_then(|digits| digits.parse().ok())
            .ok_or_else(unreadable)
    };
    Ok((number(1)?, number(2)?))
}

/// Parser for the lists-of-lists page
#[derive(Debug)]
pub struct ListOverviewParser {
    item_selectors: Vec<Selector>,
    link_selectors: Vec<Selector>,
    progress_selectors: Vec<Selector>,
}

impl ListOverviewParser {
    /// Create a new parser with default selectors
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&OverviewSelectors::default())
    }

    /// Create parser with custom selector configuration
    pub fn with_config(selectors: &OverviewSelectors) -> ParsingResult<Self> {
        Ok(Self {
            item_selectors: compile_selectors("list_item", &selectors.list_item)?,
            link_selectors: compile_selectors("list_link", &selectors.list_link)?,
            progress_selectors: compile_selectors("progress", &selectors.progress)?,
        })
    }

    /// Parse a raw HTML document
    pub fn parse_document(&self, html: &str, context: &ParseContext) -> ParsingResult<Vec<ListMetadata>> {
        let document = Html::parse_document(html);
        self.parse_with_context(&document, context)
    }

    fn extract_list(&self, item: &ElementRef<'_>, context: &ParseContext) -> ParsingResult<ListMetadata> {
        let link = select_first(item, &self.link_selectors)
            .ok_or_else(|| ParsingError::required_field_missing("list_link", Some("list entry")))?;
        let href = link
            .value()
            .attr("href")
            .ok_or_else(|| ParsingError::required_field_missing("href", Some("list link")))?;
        let id = ListId::new(resolve_url(href, &context.base_url)?);
        let title = normalized_text(&link);

        let progress = select_first(item, &self.progress_selectors).map(|e| normalized_text(&e));
        match progress.as_deref().map(parse_progress) {
            Some(Ok((checked, total))) => Ok(ListMetadata::new(id, title, checked, total)),
            Some(Err(e)) => {
                warn!("List '{}' has unreadable progress: {}", title, e);
                Ok(ListMetadata::without_counts(id, title))
            }
            None => {
                warn!("List '{}' has no progress element", title);
                Ok(ListMetadata::without_counts(id, title))
            }
        }
    }
}

impl ContextualParser for ListOverviewParser {
    type Output = Vec<ListMetadata>;
    type Context = ParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        let root = html.root_element();
        let mut tried = Vec::new();

        for (i, selector) in self.item_selectors.iter().enumerate() {
            tried.push(format!("list_item_{i}"));
            let items: Vec<ElementRef<'_>> = root.select(selector).collect();
            if items.is_empty() {
                continue;
            }

            let mut lists = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                match self.extract_list(item, context) {
                    Ok(meta) => lists.push(meta),
                    Err(e) => warn!("Skipping list entry {} on {}: {}", index, context.page_url, e),
                }
            }

            debug!("Parsed {} lists on {}", lists.len(), context.page_url);
            return Ok(lists);
        }

        Err(ParsingError::no_entries_found(&context.page_url, tried))
    }
}
