//! # Envelope Errors

use shared_crypto::CryptoError;
use thiserror::Error;

/// Errors from encoding or decoding an envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// A primitive failed while building an envelope.
    #[error("crypto failure: {0}")]
    CryptoFailure(#[from] CryptoError),

    /// The envelope has no wrapped key for this reader.
    #[error("recipient not found: {0}")]
    RecipientNotFound(String),

    /// Bad signature, bad key unwrap or bad padding.
    #[error("envelope verification failed")]
    VerificationFailure,

    /// Bytes did not parse, or carry a different document type than expected.
    #[error("envelope decode failure: {0}")]
    DecodeFailure(String),

    /// A document parsed but breaks a field rule.
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl EnvelopeError {
    pub(crate) fn decode(message: impl Into<String>) -> Self {
        EnvelopeError::DecodeFailure(message.into())
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        EnvelopeError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl From<prost::DecodeError> for EnvelopeError {
    fn from(e: prost::DecodeError) -> Self {
        EnvelopeError::DecodeFailure(e.to_string())
    }
}
