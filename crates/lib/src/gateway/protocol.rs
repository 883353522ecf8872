//! JSON bodies returned by the gateway.

use crate::commit::CommitResult;
use serde::{Deserialize, Serialize};

/// Success body for `POST /gmail/inbound`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundResponse {
    pub status: String,
    pub path: String,
    pub branch: String,
    /// Commit sha; `null` when the store did not report one.
    pub commit: Option<String>,
}

impl From<CommitResult> for InboundResponse {
    fn from(r: CommitResult) -> Self {
        Self {
            status: "ok".to_string(),
            path: r.path,
            branch: r.branch,
            commit: r.commit,
        }
    }
}

/// Error body; `detail` carries the upstream body verbatim for store failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: String,
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}
