//! `ListSource` backed by the movie-tracking website
//!
//! Fetches pages with `HttpClient` and hands the HTML to the overview and list
//! parsers. Movies found in the persisted owned set are flagged as owned even
//! when the page does not mark them.

use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::crosscheck::{FetchError, ListSource};
use crate::domain::{ListMetadata, SelectableList, UncheckedMovie};
use crate::infrastructure::parsing::{ListOverviewParser, ParseContext, ParsingConfig, UncheckedListParser};
use crate::infrastructure::simple_http_client::HttpClient;

/// List source reading the lists-of-lists page and individual list pages
#[derive(Debug)]
pub struct SiteListSource {
    client: HttpClient,
    overview_url: String,
    base_url: String,
    overview_parser: ListOverviewParser,
    list_parser: UncheckedListParser,
    owned: HashSet<String>,
}

impl SiteListSource {
    pub fn new(client: HttpClient, overview_url: impl Into<String>, parsing: &ParsingConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client,
            overview_url: overview_url.into(),
            base_url: parsing.base_url.clone(),
            overview_parser: ListOverviewParser::with_config(&parsing.overview_selectors)?,
            list_parser: UncheckedListParser::with_config(&parsing.movie_list_selectors)?,
            owned: HashSet::new(),
        })
    }

    /// Movie URLs to report as owned regardless of page markup
    #[must_use]
    pub fn with_owned_movies(mut self, owned: impl IntoIterator<Item = String>) -> Self {
        self.owned = owned.into_iter().collect();
        self
    }

    fn mark_owned(&self, movies: &mut [UncheckedMovie]) {
        if self.owned.is_empty() {
            return;
        }
        for movie in movies.iter_mut() {
            movie.owned |= self.owned.contains(&movie.url);
        }
    }
}

#[async_trait]
impl ListSource for SiteListSource {
    async fn list_metadata(&self) -> Result<Vec<ListMetadata>, FetchError> {
        let html = self.client.fetch_html_string(&self.overview_url).await?;
        let context = ParseContext::new(&self.overview_url, &self.base_url);
        let lists = self
            .overview_parser
            .parse_document(&html, &context)
            .map_err(|e| FetchError::Parse(e.to_string()))?;
        info!("📋 Read {} lists from {}", lists.len(), self.overview_url);
        Ok(lists)
    }

    async fn fetch_unchecked(&self, list: &SelectableList) -> Result<Vec<UncheckedMovie>, FetchError> {
        let url = list.id.as_str();
        let html = self.client.fetch_html_string(url).await?;
        let context = ParseContext::new(url, &self.base_url);
        let mut movies = self
            .list_parser
            .parse_document(&html, &context)
            .map_err(|e| FetchError::Parse(e.to_string()))?;
        self.mark_owned(&mut movies);
        debug!("'{}' yielded {} unchecked movies", list.title, movies.len());
        Ok(movies)
    }
}
