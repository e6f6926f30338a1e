//! # Protocol Errors
//!
//! Every failure a protocol step can hit, plus the disposition the chain
//! dispatcher applies to it.

use dta_01_local_store::LocalStoreError;
use dta_03_chain_client::ChainError;
use dta_04_envelope::EnvelopeError;
use dta_05_identity::IdentityError;
use shared_crypto::CryptoError;
use thiserror::Error;

/// Result alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Local store read/write failure other than a missing key.
    #[error(transparent)]
    Store(LocalStoreError),

    /// Peer IDDoc could not be fetched or decoded.
    #[error("identity lookup failed: {0}")]
    Identity(#[from] IdentityError),

    /// Left unacknowledged so the transaction is tried again.
    #[error("crypto failure: {0}")]
    Crypto(#[from] CryptoError),

    /// A required local record is missing, e.g. an order the caller named.
    #[error("key not found: {datatype}/{key}")]
    KeyNotFound { datatype: String, key: String },

    /// The share seed of an order this node holds is gone.
    #[error("no share seed stored for order {reference}")]
    MissingSeed { reference: String },

    /// The message breaks the protocol: wrong role, bad linkage, bad commitment.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Beneficiary supplied at redemption conflicts with the order, or is missing.
    #[error("beneficiary mismatch: {0}")]
    BeneficiaryMismatch(String),

    /// A caller-supplied request failed a plugin or field check.
    #[error("validation failed: {0}")]
    Validation(String),
}

/// What the dispatcher does with a failed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Retry with backoff; the chain may come back.
    Retry,
    /// Stop the dispatcher; local state can no longer be trusted.
    Fatal,
    /// Log and move on.
    Drop,
}

impl ProtocolError {
    pub(crate) fn violation(message: impl Into<String>) -> Self {
        ProtocolError::ProtocolViolation(message.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ProtocolError::Validation(message.into())
    }

    pub fn disposition(&self) -> Disposition {
        match self {
            ProtocolError::Chain(e) if e.is_transport() => Disposition::Retry,
            ProtocolError::Crypto(_) => Disposition::Retry,
            ProtocolError::Store(_) | ProtocolError::MissingSeed { .. } => Disposition::Fatal,
            _ => Disposition::Drop,
        }
    }

    /// Whether the caller named something this node has no record of.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ProtocolError::KeyNotFound { .. } | ProtocolError::Chain(ChainError::NotFound(_))
        )
    }

    /// Whether the caller's input was rejected before anything was posted.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            ProtocolError::Validation(_) | ProtocolError::BeneficiaryMismatch(_)
        )
    }
}

impl From<LocalStoreError> for ProtocolError {
    fn from(e: LocalStoreError) -> Self {
        match e {
            LocalStoreError::KeyNotFound { datatype, key } => {
                ProtocolError::KeyNotFound { datatype, key }
            }
            other => ProtocolError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispositions() {
        let transport: ProtocolError = ChainError::Transport {
            message: "connection refused".into(),
        }
        .into();
        assert_eq!(transport.disposition(), Disposition::Retry);

        let rejected: ProtocolError = ChainError::Rejected {
            code: 1,
            log: "duplicate".into(),
        }
        .into();
        assert_eq!(rejected.disposition(), Disposition::Drop);

        let io: ProtocolError = LocalStoreError::IOError {
            message: "disk full".into(),
        }
        .into();
        assert_eq!(io.disposition(), Disposition::Fatal);

        assert_eq!(
            ProtocolError::from(EnvelopeError::VerificationFailure).disposition(),
            Disposition::Drop
        );

        let crypto: ProtocolError = CryptoError::InvalidPublicKey.into();
        assert_eq!(crypto.disposition(), Disposition::Retry);
    }

    #[test]
    fn test_missing_seed_stops_the_dispatcher() {
        let e = ProtocolError::MissingSeed {
            reference: "r1".into(),
        };
        assert_eq!(e.disposition(), Disposition::Fatal);
        assert!(!e.is_not_found());
        assert_eq!(e.to_string(), "no share seed stored for order r1");
    }

    #[test]
    fn test_missing_key_is_not_store_io() {
        let e: ProtocolError = LocalStoreError::KeyNotFound {
            datatype: "keySeed".into(),
            key: "r1".into(),
        }
        .into();
        assert!(e.is_not_found());
        assert_eq!(e.disposition(), Disposition::Drop);
    }
}
