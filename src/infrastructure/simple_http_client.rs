//! HTTP client for fetching site pages with retry and request spacing
//!
//! Every request goes through `fetch_html_string`, which retries transient
//! failures (408, 429, 5xx and network errors) with exponential backoff and
//! keeps a minimum delay between consecutive requests.

use reqwest::{Client, ClientBuilder, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use crate::crosscheck::FetchError;
use crate::infrastructure::config::HttpConfig;

/// HTTP client shared by the list source
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpConfig,
    /// When the previous request was sent, shared across clones
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient").field("config", &self.config).finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpConfig) -> anyhow::Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            config,
            last_request: Arc::new(Mutex::new(None)),
        })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Fetch a page body as a string, retrying transient failures
    pub async fn fetch_html_string(&self, url: &str) -> Result<String, FetchError> {
        let attempts = total_attempts(self.config.max_retries);
        let mut last_err = FetchError::Network(format!("No attempt made for {url}"));

        for attempt in 1..=attempts {
            self.wait_for_turn().await;

            info!("🌐 HTTP GET (attempt {}/{}) : {}", attempt, attempts, url);
            match self.client.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .text()
                            .await
                            .map_err(|e| FetchError::Network(format!("Failed to read response body: {e}")));
                    }

                    error!("❌ HTTP error {} on attempt {}: {}", status, attempt, url);
                    last_err = FetchError::HttpStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    };

                    if !is_retryable(status) || attempt == attempts {
                        return Err(last_err);
                    }

                    let retry_after = resp
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.trim().parse::<u64>().ok());
                    sleep(backoff_delay(attempt, retry_after)).await;
                }
                Err(e) => {
                    warn!("⚠️ Network error on attempt {}: {}", attempt, e);
                    last_err = if e.is_timeout() {
                        FetchError::Timeout {
                            seconds: self.config.timeout_seconds,
                        }
                    } else {
                        FetchError::Network(e.to_string())
                    };
                    if attempt < attempts {
                        sleep(backoff_delay(attempt, None)).await;
                    }
                }
            }
        }

        Err(last_err)
    }

    /// Sleep until `request_delay_ms` has passed since the previous request
    async fn wait_for_turn(&self) {
        let delay = Duration::from_millis(self.config.request_delay_ms);
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + delay;
            let now = Instant::now();
            if ready_at > now {
                debug!("Spacing requests: waiting {:?}", ready_at - now);
                sleep(ready_at - now).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// The first request plus `max_retries` retries
fn total_attempts(max_retries: u32) -> u32 {
    max_retries.saturating_add(1)
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Exponential backoff in seconds, stretched to honour a Retry-After header
fn backoff_delay(attempt: u32, retry_after_secs: Option<u64>) -> Duration {
    let exponential = 2_u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_secs(retry_after_secs.map_or(exponential, |s| s.max(exponential)))
}
