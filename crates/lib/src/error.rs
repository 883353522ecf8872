//! Request-level error taxonomy for the inbound webhook.

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum InboundError {
    /// Missing or wrong shared secret; nothing else is looked at.
    #[error("Invalid webhook token")]
    Unauthorized,
    #[error("Sender not allowed: {0}")]
    SenderNotAllowed(String),
    #[error("Invalid JSON: {0}")]
    InvalidPayload(String),
    /// Read or write against the store failed; never retried here.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl InboundError {
    /// HTTP status to answer with. Upstream statuses are passed through; transport
    /// failures and unreadable store responses become 502.
    pub fn status_code(&self) -> u16 {
        match self {
            InboundError::Unauthorized | InboundError::SenderNotAllowed(_) => 403,
            InboundError::InvalidPayload(_) => 400,
            InboundError::Store(StoreError::Upstream { status, .. }) => *status,
            InboundError::Store(_) => 502,
        }
    }
}
