use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::words::{WordStore, WordStoreError};

pub const TOKEN_SETTING: &str = "github_token";
pub const OWNER_SETTING: &str = "github_owner";
pub const REPO_SETTING: &str = "github_repo";
pub const BRANCH_SETTING: &str = "github_branch";
pub const LAST_SYNC_TIME_SETTING: &str = "last_sync_time";
pub const LAST_SYNC_SHA_SETTING: &str = "last_sync_sha";

pub const DEFAULT_BRANCH: &str = "main";

/// GitHub repository the dataset file is synced with
///
/// Stored in the device-local settings of the word store, never exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

impl SyncConfig {
    pub fn new(token: &str, owner: &str, repo: &str, branch: Option<&str>) -> Self {
        let branch = branch
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_BRANCH);
        Self {
            token: token.trim().to_string(),
            owner: owner.trim().to_string(),
            repo: repo.trim().to_string(),
            branch: branch.to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.token.is_empty() && !self.owner.is_empty() && !self.repo.is_empty()
    }

    /// Read whatever is stored; missing fields come back empty
    pub fn load(store: &dyn WordStore) -> Result<Self, WordStoreError> {
        let get = |key| -> Result<String, WordStoreError> {
            Ok(store.get_setting_str(key)?.unwrap_or_default())
        };
        let branch = store.get_setting_str(BRANCH_SETTING)?;
        Ok(Self::new(
            &get(TOKEN_SETTING)?,
            &get(OWNER_SETTING)?,
            &get(REPO_SETTING)?,
            branch.as_deref(),
        ))
    }

    pub fn save(&self, store: &mut dyn WordStore) -> Result<(), WordStoreError> {
        store.set_setting(TOKEN_SETTING, json!(self.token))?;
        store.set_setting(OWNER_SETTING, json!(self.owner))?;
        store.set_setting(REPO_SETTING, json!(self.repo))?;
        store.set_setting(BRANCH_SETTING, json!(self.branch))?;
        Ok(())
    }

    /// Token with all but the last four characters hidden
    pub fn masked_token(&self) -> String {
        let count = self.token.chars().count();
        if count <= 4 {
            return "*".repeat(count);
        }
        let tail: String = self.token.chars().skip(count - 4).collect();
        format!("****{}", tail)
    }
}

/// Options for the remote endpoint, from the application config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    pub api_base_url: String,
    /// Path of the dataset file inside the repository
    pub data_file_path: String,
    pub timeout_secs: u64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            data_file_path: "data/vocabulary-data.json".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Sync state reported to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub configured: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub last_sync_sha: Option<String>,
    pub syncing: bool,
}

/// Repository details returned by a connection test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoInfo {
    pub repo_name: String,
    pub private: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Uploaded,
    Downloaded,
    Merged,
}

/// Result of a completed sync protocol
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub action: SyncAction,
    /// Words in the local store after the sync
    pub words: usize,
    /// Revision token of the remote file
    pub sha: String,
    pub synced_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::words::SqliteWordStore;

    #[test]
    fn test_branch_defaults_to_main() {
        let config = SyncConfig::new(" tok ", "me", "vocab", Some("  "));
        assert_eq!(config.token, "tok");
        assert_eq!(config.branch, "main");
        assert!(config.is_complete());
        assert!(!SyncConfig::new("", "me", "vocab", None).is_complete());
    }

    #[test]
    fn test_save_and_load() {
        let mut store = SqliteWordStore::open_in_memory().unwrap();
        assert!(!SyncConfig::load(&store).unwrap().is_complete());

        let config = SyncConfig::new("ghp_secret", "me", "vocab", Some("dev"));
        config.save(&mut store).unwrap();
        assert_eq!(SyncConfig::load(&store).unwrap(), config);
    }

    #[test]
    fn test_masked_token() {
        assert_eq!(SyncConfig::new("ghp_abcdef1234", "o", "r", None).masked_token(), "****1234");
        assert_eq!(SyncConfig::new("abc", "o", "r", None).masked_token(), "***");
    }
}
