//! Configuration infrastructure
//!
//! Contains configuration loading and management for list cross-checking.
//!
//! Configuration is organized into sections:
//! 1. `crosscheck` - matching policy and scan behaviour
//! 2. `http` - request timeouts, retries, user agent
//! 3. `parsing` - site base URL and CSS selectors
//! 4. `logging` - log level and outputs
//! 5. `app_managed` - values updated by the application itself

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

use crate::crosscheck::CrossCheckSettings;
use crate::domain::{FailedListPolicy, MatchMode};
use crate::infrastructure::parsing::ParsingConfig;

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub crosscheck: CrossCheckConfig,
    pub http: HttpConfig,
    pub parsing: ParsingConfig,
    pub logging: LoggingConfig,
    pub app_managed: AppManagedConfig,
}

/// Matching policy and scan behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossCheckConfig {
    /// "intersection" or "threshold"
    pub match_mode: MatchMode,

    /// Minimum list appearances in threshold mode; 0 or below keeps everything
    pub threshold: i32,

    /// Timeout for fetching a single list, retries included
    pub fetch_timeout_seconds: u64,

    /// How a list that failed to load affects the merge
    pub failed_list_policy: FailedListPolicy,

    /// Capacity of the scan event channel
    pub event_capacity: usize,
}

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Retries after the first attempt of a request
    pub max_retries: u32,

    /// User agent string
    pub user_agent: String,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// Minimum delay between consecutive requests in milliseconds
    pub request_delay_ms: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,

    /// Enable automatic log cleanup on startup
    pub auto_cleanup_logs: bool,

    /// Module-specific log level filters (e.g., "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

/// Application-managed settings that are automatically updated by the app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppManagedConfig {
    /// Configuration version for migration purposes; files written before
    /// versioning read as 0
    #[serde(default)]
    pub config_version: u32,

    /// Timestamp of the last completed scan
    pub last_scan_at: Option<String>,

    /// Number of movies found by the last completed scan
    pub last_result_count: Option<u32>,
}

impl Default for AppManagedConfig {
    fn default() -> Self {
        Self {
            config_version: defaults::CONFIG_VERSION,
            last_scan_at: None,
            last_result_count: None,
        }
    }
}

impl Default for CrossCheckConfig {
    fn default() -> Self {
        Self {
            match_mode: MatchMode::Intersection,
            threshold: defaults::THRESHOLD,
            fetch_timeout_seconds: defaults::FETCH_TIMEOUT_SECONDS,
            failed_list_policy: FailedListPolicy::Skip,
            event_capacity: defaults::EVENT_CAPACITY,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_retries: defaults::MAX_RETRIES,
            user_agent: defaults::USER_AGENT.to_string(),
            follow_redirects: true,
            request_delay_ms: defaults::REQUEST_DELAY_MS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            max_files: defaults::LOG_MAX_FILES,
            auto_cleanup_logs: defaults::LOG_AUTO_CLEANUP,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("reqwest".to_string(), "info".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("html5ever".to_string(), "warn".to_string());
                filters
            },
        }
    }
}

impl From<&CrossCheckConfig> for CrossCheckSettings {
    fn from(config: &CrossCheckConfig) -> Self {
        Self {
            mode: config.match_mode,
            threshold: config.threshold,
            fetch_timeout: Duration::from_secs(config.fetch_timeout_seconds),
            failed_list_policy: config.failed_list_policy,
            event_capacity: config.event_capacity,
        }
    }
}

/// Configuration manager for loading and saving settings
#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Get application data directory
    pub fn get_app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get user data directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(data_dir)
    }

    /// Create a configuration manager for the default location
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join(defaults::CONFIG_FILE_NAME);
        Ok(Self { config_path })
    }

    /// Create a configuration manager for an explicit file
    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("Configuration file not found, creating default: {:?}", self.config_path);
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;

        match serde_json::from_str::<AppConfig>(&content) {
            Ok(mut config) => {
                info!("Loaded configuration from: {:?}", self.config_path);
                self.migrate_config_if_needed(&mut config).await?;
                Ok(config)
            }
            Err(parse_error) => {
                warn!("⚠️  Configuration file is unreadable: {}", parse_error);

                let backup_path = self.config_path.with_extension("json.corrupted");
                if let Err(e) = fs::copy(&self.config_path, &backup_path).await {
                    warn!("Failed to create backup of corrupted config: {}", e);
                } else {
                    info!("Backed up corrupted config to: {:?}", backup_path);
                }

                let default_config = AppConfig::default();
                self.save_config(&default_config)
                    .await
                    .context("Failed to save default configuration")?;

                info!("✅ Reset to default configuration");
                Ok(default_config)
            }
        }
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    /// Update app-managed settings (like the last scan summary)
    pub async fn update_app_managed<F>(&self, updater: F) -> Result<()>
    where
        F: FnOnce(&mut AppManagedConfig),
    {
        let mut config = self.load_config().await?;
        updater(&mut config.app_managed);
        self.save_config(&config).await
    }

    /// Bring older configuration files up to the current version
    pub async fn migrate_config_if_needed(&self, config: &mut AppConfig) -> Result<bool> {
        if config.app_managed.config_version >= defaults::CONFIG_VERSION {
            return Ok(false);
        }

        info!(
            "🔄 Migrating configuration from version {} to {}",
            config.app_managed.config_version,
            defaults::CONFIG_VERSION
        );
        config.app_managed.config_version = defaults::CONFIG_VERSION;
        self.save_config(config).await?;
        Ok(true)
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }
}

/// Default configuration values
pub mod defaults {
    /// Directory name under the platform config/data directories
    pub const APP_DIR_NAME: &str = "list-crosscheck";

    /// Configuration file name
    pub const CONFIG_FILE_NAME: &str = "list_crosscheck_config.json";

    /// Settings store file name (lives in the app data directory)
    pub const SETTINGS_FILE_NAME: &str = "settings.json";

    /// Current configuration version
    pub const CONFIG_VERSION: u32 = 1;

    /// Default minimum list appearances in threshold mode
    pub const THRESHOLD: i32 = 2;

    /// Default per-list fetch timeout in seconds
    pub const FETCH_TIMEOUT_SECONDS: u64 = 30;

    /// Default scan event channel capacity
    pub const EVENT_CAPACITY: usize = 64;

    /// Default request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 15;

    /// Default number of retries per request
    pub const MAX_RETRIES: u32 = 2;

    /// Default delay between requests in milliseconds
    pub const REQUEST_DELAY_MS: u64 = 250;

    /// Default user agent
    pub const USER_AGENT: &str = "list-crosscheck/0.3 (+https://github.com/Chanseok/list-crosscheck)";

    /// Default log level
    pub const LOG_LEVEL: &str = "info";

    /// Default JSON format setting
    pub const LOG_JSON_FORMAT: bool = false;

    /// Default console output setting
    pub const LOG_CONSOLE_OUTPUT: bool = true;

    /// Default file output setting
    pub const LOG_FILE_OUTPUT: bool = true;

    /// Default maximum log files to keep
    pub const LOG_MAX_FILES: u32 = 5;

    /// Default auto cleanup logs setting
    pub const LOG_AUTO_CLEANUP: bool = true;
}
