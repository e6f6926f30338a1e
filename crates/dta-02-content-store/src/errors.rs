//! Content store errors.

use thiserror::Error;

/// Errors from a [`ContentStore`](crate::ContentStore).
#[derive(Debug, Error)]
pub enum ContentStoreError {
    /// Nothing stored under this CID.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The argument is not a CIDv0 string.
    #[error("invalid CID: {0:?}")]
    InvalidCid(String),

    /// Stored bytes do not hash to the requested CID.
    #[error("document not valid: {cid}")]
    InvalidDocument { cid: String },

    /// The IPFS node could not be reached or answered with an error.
    #[error("ipfs node connection problem: {message}")]
    Connection { message: String },

    /// Local filesystem failure.
    #[error("content store I/O error: {message}")]
    Io { message: String },
}

impl From<std::io::Error> for ContentStoreError {
    fn from(e: std::io::Error) -> Self {
        ContentStoreError::Io {
            message: e.to_string(),
        }
    }
}

impl From<reqwest::Error> for ContentStoreError {
    fn from(e: reqwest::Error) -> Self {
        ContentStoreError::Connection {
            message: e.to_string(),
        }
    }
}
