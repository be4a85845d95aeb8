use async_trait::async_trait;
use thiserror::Error;

use super::config::RepoInfo;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Authentication failed: token is invalid or expired")]
    AuthFailed,
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Remote rejected the update ({status}): {message}")]
    Conflict { status: u16, message: String },
    #[error("Remote error: {status} - {message}")]
    Transport { status: u16, message: String },
    #[error("Invalid remote content: {0}")]
    Decode(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A file fetched from the remote, content already decoded
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFile {
    pub content: String,
    /// Revision token to pass back as the precondition of the next write
    pub sha: String,
}

/// Versioned file storage the sync protocols talk to
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch a file at the given branch or ref
    async fn fetch_file(&self, path: &str, reference: &str) -> Result<RemoteFile, RemoteError>;

    /// Create or replace a file, returning its new revision token
    ///
    /// With `expected_sha` set the write only succeeds if the remote file is
    /// still at that revision.
    async fn put_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
        expected_sha: Option<&str>,
    ) -> Result<String, RemoteError>;

    async fn get_repo_info(&self) -> Result<RepoInfo, RemoteError>;
}
