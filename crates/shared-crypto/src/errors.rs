//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
///
/// Every variant maps to the `CryptoFailure` kind at the protocol layer,
/// except [`CryptoError::VerificationFailed`] which callers surface as a
/// verification failure.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Buffer of the wrong size
    #[error("Invalid length for {what}: expected {expected}, got {actual}")]
    InvalidLength {
        /// What was being measured
        what: &'static str,
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// Signature, padding or MAC check failed.
    ///
    /// Deliberately carries no detail so callers cannot tell which check fired.
    #[error("Verification failed")]
    VerificationFailed,

    /// Input could not be parsed as the expected encoding
    #[error("Parse failure: {0}")]
    ParseFailure(String),

    /// Underlying primitive rejected the operation
    #[error("Library failure: {0}")]
    LibraryFailure(String),

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Key generation failed
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),
}

impl From<hex::FromHexError> for CryptoError {
    fn from(e: hex::FromHexError) -> Self {
        CryptoError::ParseFailure(format!("hex: {}", e))
    }
}
