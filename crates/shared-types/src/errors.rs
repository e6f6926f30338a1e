//! # Error Types
//!
//! Errors raised while parsing the closed vocabularies of this crate.

use thiserror::Error;

/// Parse failures for wire-level enumerations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Processor tag outside the five-string vocabulary.
    #[error("Unknown processor tag: {0}")]
    UnknownProcessor(String),

    /// Node type outside {multi, principal, fiduciary, masterfiduciary}.
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),
}
