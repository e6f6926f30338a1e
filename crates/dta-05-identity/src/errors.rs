//! Identity errors.

use dta_02_content_store::ContentStoreError;
use dta_04_envelope::EnvelopeError;
use shared_crypto::CryptoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("key derivation failed: {0}")]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    ContentStore(#[from] ContentStoreError),

    /// The key file could not be read or written.
    #[error("key store error: {message}")]
    KeyStore { message: String },

    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A published IDDoc does not match the local seed or name.
    #[error("identity mismatch: {0}")]
    Mismatch(&'static str),
}

impl From<std::io::Error> for IdentityError {
    fn from(e: std::io::Error) -> Self {
        IdentityError::KeyStore {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for IdentityError {
    fn from(e: serde_json::Error) -> Self {
        IdentityError::KeyStore {
            message: e.to_string(),
        }
    }
}
