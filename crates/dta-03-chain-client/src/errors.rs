//! Chain client errors.

use thiserror::Error;

/// Errors from a [`ChainClient`](crate::ChainClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Node unreachable, timed out, or the subscription dropped. Retryable.
    #[error("chain transport error: {message}")]
    Transport { message: String },

    /// No transaction with this hash.
    #[error("transaction not found: {0}")]
    NotFound(String),

    /// The node accepted the request but refused the transaction.
    #[error("transaction rejected (code {code}): {log}")]
    Rejected { code: u32, log: String },

    /// The node answered with something this client cannot parse.
    #[error("invalid chain response: {message}")]
    InvalidResponse { message: String },
}

impl ChainError {
    /// Whether retrying the same call may succeed.
    pub fn is_transport(&self) -> bool {
        matches!(self, ChainError::Transport { .. })
    }

    pub(crate) fn transport(message: impl Into<String>) -> Self {
        ChainError::Transport {
            message: message.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ChainError::InvalidResponse {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ChainError::invalid(e.to_string())
        } else {
            ChainError::transport(e.to_string())
        }
    }
}
