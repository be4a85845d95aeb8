use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use thiserror::Error;

use crate::words::{lock_store, validate_snapshot, Dataset, SharedStore, WordStoreError};

use super::config::{
    RepoInfo, SyncAction, SyncConfig, SyncOptions, SyncResult, SyncStatus, LAST_SYNC_SHA_SETTING,
    LAST_SYNC_TIME_SETTING,
};
use super::github::GitHubClient;
use super::merge::merge_data;
use super::remote::{RemoteError, RemoteStore};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Store(#[from] WordStoreError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Sync not configured: GitHub token, owner and repo are required")]
    NotConfigured,
    #[error("Sync in progress, please wait")]
    InProgress,
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Builds the remote client for a configuration
pub type Connector =
    Box<dyn Fn(&SyncConfig, &SyncOptions) -> std::result::Result<Arc<dyn RemoteStore>, RemoteError> + Send + Sync>;

/// Holds the syncing flag for the lifetime of one protocol run
struct SyncGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Runs the upload, download and smart-sync protocols against a remote
pub struct SyncManager {
    store: SharedStore,
    options: SyncOptions,
    connector: Connector,
    syncing: AtomicBool,
}

impl SyncManager {
    /// Create a sync manager talking to GitHub
    pub fn new(store: SharedStore, options: SyncOptions) -> Self {
        Self::with_connector(
            store,
            options,
            Box::new(|config: &SyncConfig, options: &SyncOptions| {
                let timeout = Duration::from_secs(options.timeout_secs);
                let client = GitHubClient::new(&options.api_base_url, config, timeout)?;
                Ok::<_, RemoteError>(Arc::new(client) as Arc<dyn RemoteStore>)
            }),
        )
    }

    pub fn with_connector(store: SharedStore, options: SyncOptions, connector: Connector) -> Self {
        Self {
            store,
            options,
            connector,
            syncing: AtomicBool::new(false),
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<SyncGuard<'_>> {
        self.syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SyncError::InProgress)?;
        Ok(SyncGuard { flag: &self.syncing })
    }

    /// The stored configuration, which may be incomplete
    pub fn config(&self) -> Result<SyncConfig> {
        Ok(SyncConfig::load(&*lock_store(&self.store))?)
    }

    pub fn save_config(&self, config: &SyncConfig) -> Result<()> {
        config.save(&mut *lock_store(&self.store))?;
        log::info!("Saved sync config for {}/{} ({})", config.owner, config.repo, config.branch);
        Ok(())
    }

    pub fn is_configured(&self) -> Result<bool> {
        Ok(self.config()?.is_complete())
    }

    fn require_config(&self) -> Result<SyncConfig> {
        let config = self.config()?;
        if !config.is_complete() {
            return Err(SyncError::NotConfigured);
        }
        Ok(config)
    }

    fn connect(&self, config: &SyncConfig) -> Result<Arc<dyn RemoteStore>> {
        Ok((self.connector)(config, &self.options)?)
    }

    pub fn status(&self) -> Result<SyncStatus> {
        let store = lock_store(&self.store);
        let configured = SyncConfig::load(&*store)?.is_complete();
        let last_sync_time = store
            .get_setting(LAST_SYNC_TIME_SETTING)?
            .and_then(|v| v.as_i64())
            .and_then(DateTime::from_timestamp_millis);
        let last_sync_sha = store.get_setting_str(LAST_SYNC_SHA_SETTING)?;

        Ok(SyncStatus {
            configured,
            last_sync_time,
            last_sync_sha,
            syncing: self.is_syncing(),
        })
    }

    /// Check the credentials by reading the repository details
    pub async fn test_connection(&self) -> Result<RepoInfo> {
        let config = self.require_config()?;
        let remote = self.connect(&config)?;
        let info = remote.get_repo_info().await?;
        log::info!("Connected to {} (private: {})", info.repo_name, info.private);
        Ok(info)
    }

    /// Push the local dataset, replacing the remote file
    pub async fn upload(&self) -> Result<SyncResult> {
        let _guard = self.begin()?;
        self.upload_inner().await
    }

    async fn upload_inner(&self) -> Result<SyncResult> {
        let config = self.require_config()?;
        let (dataset, cached_sha) = {
            let store = lock_store(&self.store);
            (store.export_snapshot()?, store.get_setting_str(LAST_SYNC_SHA_SETTING)?)
        };

        let remote = self.connect(&config)?;
        let now = Utc::now();
        let sha = remote
            .put_file(
                &self.options.data_file_path,
                &serde_json::to_string_pretty(&dataset)?,
                &format!("Update vocabulary data - {}", iso(now)),
                &config.branch,
                cached_sha.as_deref(),
            )
            .await?;

        self.record_sync(&sha, now)?;
        log::info!("Uploaded {} words (sha {})", dataset.words.len(), sha);

        Ok(SyncResult {
            action: SyncAction::Uploaded,
            words: dataset.words.len(),
            sha,
            synced_at: now,
        })
    }

    /// Replace the local dataset with the remote file
    pub async fn download(&self) -> Result<SyncResult> {
        let _guard = self.begin()?;
        let config = self.require_config()?;
        let remote = self.connect(&config)?;

        let file = remote
            .fetch_file(&self.options.data_file_path, &config.branch)
            .await?;
        let dataset: Dataset = serde_json::from_str(&file.content)?;

        let imported = lock_store(&self.store).import_snapshot(&dataset)?;
        let now = Utc::now();
        self.record_sync(&file.sha, now)?;
        log::info!("Downloaded {} words (sha {})", imported, file.sha);

        Ok(SyncResult {
            action: SyncAction::Downloaded,
            words: imported,
            sha: file.sha,
            synced_at: now,
        })
    }

    /// Merge local and remote, then write the result to both sides
    ///
    /// Falls back to an upload when the remote file does not exist yet.
    pub async fn smart_sync(&self) -> Result<SyncResult> {
        let _guard = self.begin()?;
        let config = self.require_config()?;
        let remote = self.connect(&config)?;

        let file = match remote
            .fetch_file(&self.options.data_file_path, &config.branch)
            .await
        {
            Ok(file) => file,
            Err(RemoteError::NotFound(_)) => {
                log::info!("No remote data found, uploading local data");
                return self.upload_inner().await;
            }
            Err(e) => return Err(e.into()),
        };
        let remote_data: Dataset = serde_json::from_str(&file.content)?;

        let now = Utc::now();
        let local_data = lock_store(&self.store).export_snapshot()?;
        let merged = merge_data(&local_data, &remote_data, now);
        validate_snapshot(&merged)?;

        // Local data is replaced only once the remote accepted the merge
        let sha = remote
            .put_file(
                &self.options.data_file_path,
                &serde_json::to_string_pretty(&merged)?,
                &format!("Merge vocabulary data - {}", iso(now)),
                &config.branch,
                Some(&file.sha),
            )
            .await?;

        lock_store(&self.store).import_snapshot(&merged)?;
        self.record_sync(&sha, now)?;
        log::info!("Merged and synced {} words (sha {})", merged.words.len(), sha);

        Ok(SyncResult {
            action: SyncAction::Merged,
            words: merged.words.len(),
            sha,
            synced_at: now,
        })
    }

    fn record_sync(&self, sha: &str, at: DateTime<Utc>) -> Result<()> {
        let mut store = lock_store(&self.store);
        store.set_setting(LAST_SYNC_TIME_SETTING, json!(at.timestamp_millis()))?;
        store.set_setting(LAST_SYNC_SHA_SETTING, json!(sha))?;
        Ok(())
    }
}

fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
