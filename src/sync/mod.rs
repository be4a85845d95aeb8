//! GitHub synchronization of the vocabulary dataset
//!
//! The whole dataset travels as one JSON file in a GitHub repository. Three
//! protocols move it: upload (local replaces remote), download (remote
//! replaces local) and smart sync (merge both, write the result to each side).

pub mod config;
pub mod github;
pub mod merge;
pub mod remote;

mod manager;

pub use config::{RepoInfo, SyncAction, SyncConfig, SyncOptions, SyncResult, SyncStatus};
pub use github::GitHubClient;
pub use manager::{Connector, SyncError, SyncManager};
pub use merge::merge_data;
pub use remote::{RemoteError, RemoteFile, RemoteStore};
