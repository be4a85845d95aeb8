//! Application configuration
//!
//! Read from `config.toml` in the data directory. Every field has a default,
//! so a missing file (or a partial one) is fine.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sync::SyncOptions;

pub const CONFIG_FILE_NAME: &str = "config.toml";
const APP_DIR_NAME: &str = "lexis";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Data directory not found")]
    DataDirNotFound,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the database; set from where the config was loaded
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Database file name, relative to the data directory
    pub database: String,
    pub sync: SyncOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
            database: "lexis.db".to_string(),
            sync: SyncOptions::default(),
        }
    }
}

impl AppConfig {
    /// Platform data directory for the application
    pub fn default_data_dir() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or(ConfigError::DataDirNotFound)
    }

    /// Load the config from `data_dir`, or the default data directory
    pub fn load(data_dir: Option<&Path>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => Self::default_data_dir()?,
        };

        let path = data_dir.join(CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            log::debug!("Loaded config from {}", path.display());
            toml::from_str(&raw)?
        } else {
            Self::default()
        };
        config.data_dir = data_dir;
        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::load(Some(temp_dir.path())).unwrap();

        assert_eq!(config.database_path(), temp_dir.path().join("lexis.db"));
        assert_eq!(config.sync.api_base_url, "https://api.github.com");
        assert_eq!(config.sync.data_file_path, "data/vocabulary-data.json");
        assert_eq!(config.sync.timeout_secs, 60);
    }

    #[test]
    fn test_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "database = \"words.db\"\n\n[sync]\ndata_file_path = \"vocab.json\"\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(temp_dir.path())).unwrap();
        assert_eq!(config.database, "words.db");
        assert_eq!(config.sync.data_file_path, "vocab.json");
        assert_eq!(config.sync.api_base_url, "https://api.github.com");
    }

    #[test]
    fn test_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "database = [").unwrap();
        assert!(matches!(
            AppConfig::load(Some(temp_dir.path())),
            Err(ConfigError::Toml(_))
        ));
    }
}
