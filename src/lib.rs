//! List Crosscheck - cross-reference engine for movie-tracking checklists
//!
//! Compares a user's selection of movie lists and reports the unchecked movies
//! they share, either those on every list or those on at least N lists.

// Module declarations
pub mod crosscheck;
pub mod domain;
pub mod infrastructure;

use anyhow::{Result, bail};
use std::sync::Arc;
use tracing::{info, warn};

use crate::crosscheck::{CrossCheckEngine, CrossCheckSettings};
use crate::domain::{ListId, ScanEvent, ScanOutcome};
use crate::infrastructure::parsing::resolve_url;
use crate::infrastructure::{ConfigManager, HttpClient, SettingsStore, SiteListSource, init_logging_with_config};

const USAGE: &str = "usage: list-crosscheck <lists-overview-url> <list-url> <list-url> [...]";

/// Command line arguments of the console driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverArgs {
    pub overview_url: String,
    pub list_urls: Vec<String>,
}

impl DriverArgs {
    /// Parse arguments without the program name
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let Some(overview_url) = args.next() else {
            bail!(USAGE);
        };
        let list_urls: Vec<String> = args.collect();
        if list_urls.len() < 2 {
            bail!("at least two list URLs are required\n{USAGE}");
        }
        Ok(Self { overview_url, list_urls })
    }
}

/// Console driver: select the given lists, scan them, print the shared movies
pub async fn run() -> Result<()> {
    let args = DriverArgs::parse(std::env::args().skip(1))?;

    let config_manager = ConfigManager::new()?;
    let config = config_manager.load_config().await?;
    init_logging_with_config(&config.logging)?;
    infrastructure::logging::log_system_info();

    let settings_store = SettingsStore::open_default().await?;
    let owned = settings_store.owned_movies()?;
    info!("Loaded {} owned movies from {}", owned.len(), settings_store.path().display());

    let client = HttpClient::with_config(config.http.clone())?;
    let source = SiteListSource::new(client, &args.overview_url, &config.parsing)?.with_owned_movies(owned);
    let engine = CrossCheckEngine::new(Arc::new(source), CrossCheckSettings::from(&config.crosscheck));

    engine.activate().await;
    for url in &args.list_urls {
        let id = ListId::new(resolve_url(url, &config.parsing.base_url)?);
        engine.toggle_selection(id).await;
    }

    let progress = tokio::spawn(log_progress(engine.subscribe()));
    let interrupt = {
        let engine = engine.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C, stopping scan");
                engine.deactivate().await;
            }
        })
    };

    let outcome = engine.start_scan().await;
    interrupt.abort();
    progress.abort();

    match outcome? {
        ScanOutcome::Completed(results) => {
            println!("{} movies found across {}", results.len(), results.processed_lists.join(", "));
            for movie in &results.movies {
                let owned = if movie.owned { " (owned)" } else { "" };
                println!("  {movie}{owned}  {}", movie.url);
            }
            engine.acknowledge_results().await;

            let count = u32::try_from(results.len()).unwrap_or(u32::MAX);
            let completed_at = results.completed_at.to_rfc3339();
            config_manager
                .update_app_managed(|managed| {
                    managed.last_scan_at = Some(completed_at);
                    managed.last_result_count = Some(count);
                })
                .await?;
        }
        ScanOutcome::Cancelled => warn!("Scan cancelled before completion"),
    }

    Ok(())
}

async fn log_progress(mut events: tokio::sync::broadcast::Receiver<ScanEvent>) {
    use tokio::sync::broadcast::error::RecvError;

    loop {
        match events.recv().await {
            Ok(ScanEvent::ListMerged {
                index,
                title,
                status,
                contributed,
                remaining,
            }) => info!(
                "[{}] {} → {:?}, {} unchecked, {} candidates left",
                index + 1,
                title,
                status,
                contributed,
                remaining
            ),
            Ok(ScanEvent::ScanAborted { skipped, .. }) => info!("No candidates left, {} lists skipped", skipped),
            Ok(ScanEvent::ScanComplete(_)) | Err(RecvError::Closed) => break,
            Ok(_) => {}
            Err(RecvError::Lagged(n)) => warn!("Progress display skipped {} events", n),
        }
    }
}
