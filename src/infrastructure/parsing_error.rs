//! Parsing error types for list and overview pages
//!
//! Detailed error types for HTML parsing operations, with enough context to
//! tell a changed page layout apart from a single malformed entry.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("Required field '{field}' not found in HTML")]
    RequiredFieldMissing {
        field: String,
        context: Option<String>,
    },

    #[error("No entries found on {page_url}")]
    NoEntriesFound {
        page_url: String,
        tried_selectors: Vec<String>,
    },

    #[error("URL resolution failed: {url} - {reason}")]
    UrlResolutionFailed {
        url: String,
        reason: String,
        base_url: Option<String>,
    },

    #[error("Progress text unreadable: '{text}'")]
    ProgressUnreadable { text: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String, field: String },
}

impl ParsingError {
    /// Create a required field missing error with context
    pub fn required_field_missing(field: &str, context: Option<&str>) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
            context: context.map(ToString::to_string),
        }
    }

    /// Create a no entries found error with tried selectors
    pub fn no_entries_found(page_url: &str, tried_selectors: Vec<String>) -> Self {
        Self::NoEntriesFound {
            page_url: page_url.to_string(),
            tried_selectors,
        }
    }

    /// Whether the rest of the page can still be used after this error.
    ///
    /// Entry-level problems only drop that entry; page-level problems make the
    /// whole page unusable.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::RequiredFieldMissing { .. } => true,
            Self::UrlResolutionFailed { .. } => true,
            Self::ProgressUnreadable { .. } => true,
            Self::NoEntriesFound { .. } => false,
            Self::ConfigurationError { .. } => false,
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
