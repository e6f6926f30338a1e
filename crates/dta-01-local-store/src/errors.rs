//! # Local Store Errors

use thiserror::Error;

/// Errors surfaced by the local store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocalStoreError {
    /// No value stored under `key` for `datatype`.
    #[error("key not found: {datatype}/{key}")]
    KeyNotFound { datatype: String, key: String },

    /// Backend read or write failed. Callers treat this as fatal.
    #[error("local store I/O error: {message}")]
    IOError { message: String },

    /// A stored value could not be encoded or decoded.
    #[error("local store codec error: {message}")]
    Codec { message: String },
}

impl LocalStoreError {
    /// Whether this is a [`LocalStoreError::KeyNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, LocalStoreError::KeyNotFound { .. })
    }
}

impl From<serde_json::Error> for LocalStoreError {
    fn from(e: serde_json::Error) -> Self {
        LocalStoreError::Codec {
            message: e.to_string(),
        }
    }
}
