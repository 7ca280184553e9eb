use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::client::{BackendClient, DEFAULT_BACKEND_URL, DEFAULT_UPLOAD_TIMEOUT};

pub const BACKEND_URL_ENV: &str = "FINTRACK_BACKEND_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    pub upload_timeout_secs: u64,
    pub chat_timeout_secs: Option<u64>,
    pub last_directory: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            upload_timeout_secs: DEFAULT_UPLOAD_TIMEOUT.as_secs(),
            chat_timeout_secs: None,
            last_directory: None,
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Remember where the last processed document came from. An unreadable
    /// file is left untouched rather than replaced with defaults.
    pub fn save_last_directory_at(config_path: &Path, dir: &Path) -> Result<()> {
        let mut config = match Self::load_from(config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %err,
                    "config file could not be read, not remembering directory"
                );
                return Ok(());
            }
        };
        config.last_directory = Some(dir.to_path_buf());
        config.save_to(config_path)
    }

    /// Environment overrides the file; command-line flags are applied by the caller.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                self.backend_url = url;
            }
        }
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn chat_timeout(&self) -> Option<Duration> {
        self.chat_timeout_secs.map(Duration::from_secs)
    }

    pub fn client(&self) -> BackendClient {
        BackendClient::new(&self.backend_url)
            .with_upload_timeout(self.upload_timeout())
            .with_chat_timeout(self.chat_timeout())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("fintrack").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.backend_url, "http://127.0.0.1:8000");
        assert_eq!(config.upload_timeout(), Duration::from_secs(600));
        assert_eq!(config.chat_timeout(), None);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            backend_url: "http://rag.internal:9000".to_string(),
            upload_timeout_secs: 30,
            chat_timeout_secs: Some(45),
            last_directory: Some(PathBuf::from("/reports")),
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"backend_url":"http://10.0.0.2:8000"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.backend_url, "http://10.0.0.2:8000");
        assert_eq!(config.upload_timeout_secs, 600);
    }

    #[test]
    fn last_directory_is_merged_into_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"backend_url":"http://10.0.0.2:8000","chat_timeout_secs":20}"#).unwrap();

        Config::save_last_directory_at(&path, Path::new("/reports/2024")).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.backend_url, "http://10.0.0.2:8000");
        assert_eq!(config.chat_timeout_secs, Some(20));
        assert_eq!(config.last_directory, Some(PathBuf::from("/reports/2024")));
    }

    #[test]
    fn broken_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let broken = r#"{"backend_url":"http://10.0.0.2:8000","#;
        fs::write(&path, broken).unwrap();

        Config::save_last_directory_at(&path, Path::new("/reports")).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), broken);
    }
}
