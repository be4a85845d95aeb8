//! Wiring of the store, scheduler, word manager and sync manager

use std::path::Path;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::config::{AppConfig, ConfigError};
use crate::sync::SyncManager;
use crate::words::{Scheduler, SharedStore, SqliteWordStore, WordManager, WordStoreError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] WordStoreError),
}

/// Everything a front end needs, sharing one word store
pub struct Lexis {
    pub config: AppConfig,
    pub store: SharedStore,
    pub words: WordManager,
    pub sync: SyncManager,
}

impl Lexis {
    /// Open the application in `data_dir` (or the default data directory)
    pub fn open(data_dir: Option<&Path>) -> Result<Self, AppError> {
        let config = AppConfig::load(data_dir)?;
        let store = SqliteWordStore::open(&config.database_path())?;
        log::info!("Opened word store at {}", config.database_path().display());
        Ok(Self::with_store(config, Arc::new(Mutex::new(store))))
    }

    pub fn with_store(config: AppConfig, store: SharedStore) -> Self {
        let words = WordManager::new(Arc::clone(&store));
        let sync = SyncManager::new(Arc::clone(&store), config.sync.clone());
        Self {
            config,
            store,
            words,
            sync,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        self.words.scheduler()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_shares_one_store() {
        let temp_dir = TempDir::new().unwrap();
        let app = Lexis::open(Some(temp_dir.path())).unwrap();

        let id = app.words.add_word("apple", "苹果", "", None).unwrap();
        assert_eq!(app.scheduler().get_today_words(5).unwrap()[0].id, id);
        assert!(!app.sync.is_configured().unwrap());
        assert!(temp_dir.path().join("lexis.db").exists());
    }
}
