use std::future::Future;
use std::path::Path;

use anyhow::{Context, Result};

use lexis_lib::words::{lock_store, Word};
use lexis_lib::Lexis;

/// Shared application state for CLI commands
pub struct App {
    pub lexis: Lexis,
}

impl App {
    /// Open the data directory (default: platform data dir)
    pub fn new(data_dir: Option<&Path>) -> Result<Self> {
        let lexis = Lexis::open(data_dir).context("Failed to open word store")?;
        Ok(Self { lexis })
    }

    pub fn get_word(&self, id: i64) -> Result<Word> {
        self.lexis
            .words
            .get_word(id)
            .context("Failed to read word")?
            .with_context(|| format!("No word with id {}", id))
    }

    /// Read a setting as a string, for display
    pub fn setting(&self, key: &str) -> Result<Option<String>> {
        lock_store(&self.lexis.store)
            .get_setting_str(key)
            .context("Failed to read settings")
    }

    pub fn set_setting(&self, key: &str, value: serde_json::Value) -> Result<()> {
        lock_store(&self.lexis.store)
            .set_setting(key, value)
            .context("Failed to save setting")
    }

    /// Run a sync call to completion on a fresh runtime
    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;
        Ok(runtime.block_on(future))
    }
}
