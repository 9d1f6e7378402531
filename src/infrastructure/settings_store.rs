//! Persistent key-value settings store
//!
//! A single JSON object on disk. Values are arbitrary serde types addressed by
//! key; every `set` writes the whole file back. The owned-movies list is kept
//! under its own key and consulted when marking results as owned.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::infrastructure::config::{ConfigManager, defaults};

const OWNED_MOVIES_KEY: &str = "owned_movies";

/// JSON-file backed settings store
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl SettingsStore {
    /// Open the store in the application data directory
    pub async fn open_default() -> Result<Self> {
        let dir = ConfigManager::get_app_data_dir()?;
        Self::open(dir.join(defaults::SETTINGS_FILE_NAME)).await
    }

    /// Open the store at `path`; a missing file is an empty store
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let content = fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read settings file {}", path.display()))?;
            match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    warn!("⚠️ Settings file {} is not a JSON object, starting empty", path.display());
                    Map::new()
                }
            }
        } else {
            debug!("No settings file at {}, starting empty", path.display());
            Map::new()
        };

        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a value; `None` when the key is absent
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.values
            .get(key)
            .map(|v| serde_json::from_value(v.clone()).with_context(|| format!("Invalid value for setting '{key}'")))
            .transpose()
    }

    /// Store a value and persist the file
    pub async fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).with_context(|| format!("Failed to serialize setting '{key}'"))?;
        self.values.insert(key.to_string(), value);
        self.persist().await
    }

    /// Movie URLs the user has marked as owned
    pub fn owned_movies(&self) -> Result<BTreeSet<String>> {
        Ok(self.get(OWNED_MOVIES_KEY)?.unwrap_or_default())
    }

    pub async fn set_owned_movies(&mut self, urls: &BTreeSet<String>) -> Result<()> {
        self.set(OWNED_MOVIES_KEY, urls).await
    }

    /// Add one movie URL to the owned list; returns false if it was already there
    pub async fn add_owned_movie(&mut self, url: &str) -> Result<bool> {
        let mut owned = self.owned_movies()?;
        if !owned.insert(url.to_string()) {
            return Ok(false);
        }
        self.set_owned_movies(&owned).await?;
        info!("Marked {} as owned ({} owned movies)", url, owned.len());
        Ok(true)
    }

    async fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create settings directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(&self.values).context("Failed to serialize settings")?;
        fs::write(&self.path, content)
            .await
            .with_context(|| format!("Failed to write settings file {}", self.path.display()))?;
        debug!("Settings saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut store = SettingsStore::open(&path).await.unwrap();
        assert_eq!(store.get::<u32>("last_threshold").unwrap(), None);
        store.set("last_threshold", &3_u32).await.unwrap();
        store.set("selected", &vec!["a", "b"]).await.unwrap();

        let reopened = SettingsStore::open(&path).await.unwrap();
        assert_eq!(reopened.get::<u32>("last_threshold").unwrap(), Some(3));
        assert_eq!(reopened.get::<Vec<String>>("selected").unwrap(), Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[tokio::test]
    async fn owned_movies_are_deduplicated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let mut store = SettingsStore::open(&path).await.unwrap();

        assert!(store.owned_movies().unwrap().is_empty());
        assert!(store.add_owned_movie("https://example.com/movies/ran/").await.unwrap());
        assert!(!store.add_owned_movie("https://example.com/movies/ran/").await.unwrap());

        let reopened = SettingsStore::open(&path).await.unwrap();
        assert_eq!(reopened.owned_movies().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_object_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let store = SettingsStore::open(&path).await.unwrap();
        assert_eq!(store.get::<u32>("anything").unwrap(), None);
    }

    #[tokio::test]
    async fn mistyped_value_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut store = SettingsStore::open(dir.path().join("s.json")).await.unwrap();
        store.set("count", &"not a number").await.unwrap();
        assert!(store.get::<u32>("count").is_err());
    }
}
