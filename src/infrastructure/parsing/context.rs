//! Parsing context for HTML extraction

/// Context information for parsing operations
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// URL of the page being parsed (for error reporting)
    pub page_url: String,

    /// Base URL for resolving relative links
    pub base_url: String,
}

impl ParseContext {
    /// Create new parse context
    pub fn new(page_url: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            page_url: page_url.into(),
            base_url: base_url.into(),
        }
    }
}
