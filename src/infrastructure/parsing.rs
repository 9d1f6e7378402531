//! HTML parsing for the movie-tracking site
//!
//! Two page shapes are understood: the lists-of-lists overview (list titles
//! and checked/total progress) and individual list pages (movie entries).
//! Selectors come from `ParsingConfig` with fallbacks tried in order.

pub mod config;
pub mod context;
pub mod error;
pub mod list_overview_parser;
pub mod unchecked_list_parser;

// Re-export public types
pub use config::{MovieListSelectors, OverviewSelectors, ParsingConfig};
pub use context::ParseContext;
pub use error::{ParsingError, ParsingResult};
pub use list_overview_parser::ListOverviewParser;
pub use unchecked_list_parser::UncheckedListParser;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

/// Parser trait with context support
pub trait ContextualParser {
    type Output;
    type Context;

    /// Parse HTML with contextual information
    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output>;
}

/// Compile fallback selector strings; fails only if none of them compile
pub(crate) fn compile_selectors(field: &str, selector_strings: &[String]) -> ParsingResult<Vec<Selector>> {
    let mut selectors = Vec::new();
    let mut errors = Vec::new();

    for selector_str in selector_strings {
        match Selector::parse(selector_str) {
            Ok(selector) => selectors.push(selector),
            Err(e) => {
                warn!("Failed to compile selector '{}': {}", selector_str, e);
                errors.push(format!("'{selector_str}': {e}"));
            }
        }
    }

    if selectors.is_empty() {
        return Err(ParsingError::ConfigurationError {
            message: format!("No valid selectors compiled. Errors: {}", errors.join(", ")),
            field: field.to_string(),
        });
    }

    if !errors.is_empty() {
        debug!("Some selectors failed to compile: {}", errors.join(", "));
    }

    Ok(selectors)
}

/// First element matched by any of the fallback selectors
pub(crate) fn select_first<'a>(element: &ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|s| element.select(s).next())
}

/// Element text with runs of whitespace collapsed
pub(crate) fn normalized_text(element: &ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// Resolve an href against the site base URL
pub fn resolve_url(href: &str, base_url: &str) -> ParsingResult<String> {
    let href = href.trim();
    if let Ok(absolute) = Url::parse(href) {
        return Ok(absolute.to_string());
    }

    let base = Url::parse(base_url).map_err(|e| ParsingError::UrlResolutionFailed {
        url: base_url.to_string(),
        reason: format!("Invalid base URL: {e}"),
        base_url: None,
    })?;

    base.join(href)
        .map(|u| u.to_string())
        .map_err(|e| ParsingError::UrlResolutionFailed {
            url: href.to_string(),
            reason: format!("Failed to join URL: {e}"),
            base_url: Some(base_url.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_resolution() {
        assert_eq!(
            resolve_url("/lists/top+250/", "https://example.com").unwrap(),
            "https://example.com/lists/top+250/"
        );
        assert_eq!(
            resolve_url("https://other.com/movies/x/", "https://example.com").unwrap(),
            "https://other.com/movies/x/"
        );
        assert!(resolve_url("/lists/a/", "not a url").is_err());
    }

    #[test]
    fn invalid_selectors_are_skipped_when_a_fallback_compiles() {
        let selectors = compile_selectors("test", &["[[bad".to_string(), "li".to_string()]).unwrap();
        assert_eq!(selectors.len(), 1);
        assert!(compile_selectors("test", &["[[bad".to_string()]).is_err());
    }
}
