//! Remote file store: path-addressed read, conditional write, and raw read.
//!
//! The store is the only place state lives. Every request reads fresh state and writes with the
//! revision it just read, so concurrent writers are arbitrated by the store itself.

mod encoding;
mod github;

pub use encoding::{decode_content, encode_content};
pub use github::GitHubStore;

use async_trait::async_trait;

/// Current state of a file. `revision` is `None` when the file does not exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteFileState {
    pub revision: Option<String>,
    pub text: String,
}

impl RemoteFileState {
    pub fn exists(&self) -> bool {
        self.revision.is_some()
    }
}

/// Outcome of a successful write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutResult {
    /// Identifier of the commit that recorded the write, when the store reports one.
    pub commit: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Transport failure: connect, timeout, TLS.
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The store answered with a non-success status (body kept verbatim).
    #[error("store returned {status}: {message}")]
    Upstream { status: u16, message: String },
    /// A success response whose body could not be understood.
    #[error("invalid store response: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    /// Upstream status code, if the store answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Path-addressed file store with optimistic concurrency on a revision token.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Fetch revision and text. Not-found is `Ok` with no revision and empty text.
    async fn get_file(&self, path: &str, branch: &str) -> Result<RemoteFileState, StoreError>;

    /// Create (`revision == None`) or update (`revision == Some`) a file.
    /// The store must reject the update if the file is no longer at `revision`,
    /// and reject the create if the file already exists.
    async fn put_file(
        &self,
        path: &str,
        text: &str,
        message: &str,
        branch: &str,
        revision: Option<&str>,
    ) -> Result<PutResult, StoreError>;

    /// Raw file text, or an empty string when the file cannot be read.
    async fn read_raw(&self, path: &str, branch: &str) -> Result<String, StoreError>;
}
