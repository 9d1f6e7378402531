//! Infrastructure layer: configuration, logging, HTTP, HTML parsing and persistence
//!
//! Everything here sits behind the `ListSource` seam or at the application
//! edge; the cross-check engine itself never touches the network or disk.

pub mod config;
pub mod logging;
pub mod parsing;
pub mod parsing_error;
pub mod settings_store;
pub mod simple_http_client;
pub mod site_list_source;

// Re-export commonly used items
pub use config::{AppConfig, ConfigManager, CrossCheckConfig, HttpConfig, LoggingConfig};
pub use logging::{get_log_directory, init_logging_with_config};
pub use parsing::{ListOverviewParser, ParsingConfig, ParsingError, ParsingResult, UncheckedListParser};
pub use settings_store::SettingsStore;
pub use simple_http_client::HttpClient;
pub use site_list_source::SiteListSource;
