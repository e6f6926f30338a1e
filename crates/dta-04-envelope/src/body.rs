//! # Document Registry
//!
//! The closed set of documents an envelope may carry, keyed on the wire by
//! `(type_code, version)` in the header.
//!
//! | Kind | Code | Version |
//! |------|------|---------|
//! | empty | 0 | 1.0 |
//! | SimpleString | 1 | 1.0 |
//! | IDDocument | 100 | 1.0 |
//! | OrderDocument | 101 | 1.0 |
//! | Policy | 102 | 1.0 |

use prost::Message;

use crate::errors::EnvelopeError;
use crate::proto::{IdDocument, OrderDocument, Policy, SimpleString};
use crate::validate;

/// Registry entry for a document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocKind {
    Empty,
    Simple,
    IdDocument,
    Order,
    Policy,
}

impl DocKind {
    pub const ALL: [DocKind; 5] = [
        DocKind::Empty,
        DocKind::Simple,
        DocKind::IdDocument,
        DocKind::Order,
        DocKind::Policy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DocKind::Empty => "empty",
            DocKind::Simple => "Simple",
            DocKind::IdDocument => "IDDocument",
            DocKind::Order => "OrderDocument",
            DocKind::Policy => "PolicyDocument",
        }
    }

    pub fn type_code(self) -> f32 {
        match self {
            DocKind::Empty => 0.0,
            DocKind::Simple => 1.0,
            DocKind::IdDocument => 100.0,
            DocKind::Order => 101.0,
            DocKind::Policy => 102.0,
        }
    }

    pub fn version(self) -> f32 {
        1.0
    }

    /// Look up a header `(type_code, version)` pair.
    pub fn from_wire(type_code: f32, version: f32) -> Option<DocKind> {
        DocKind::ALL
            .into_iter()
            .find(|k| k.type_code() == type_code && (k.version() == version || *k == DocKind::Empty))
    }
}

/// A document as carried in an envelope body.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    Empty,
    Simple(SimpleString),
    IdDocument(IdDocument),
    Order(OrderDocument),
    Policy(Policy),
}

impl Body {
    pub fn kind(&self) -> DocKind {
        match self {
            Body::Empty => DocKind::Empty,
            Body::Simple(_) => DocKind::Simple,
            Body::IdDocument(_) => DocKind::IdDocument,
            Body::Order(_) => DocKind::Order,
            Body::Policy(_) => DocKind::Policy,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// Serialized document; empty for [`Body::Empty`].
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Body::Empty => Vec::new(),
            Body::Simple(doc) => doc.encode_to_vec(),
            Body::IdDocument(doc) => doc.encode_to_vec(),
            Body::Order(doc) => doc.encode_to_vec(),
            Body::Policy(doc) => doc.encode_to_vec(),
        }
    }

    /// Parse `bytes` as a document of `kind`.
    pub fn parse(kind: DocKind, bytes: &[u8]) -> Result<Body, EnvelopeError> {
        Ok(match kind {
            DocKind::Empty => Body::Empty,
            DocKind::Simple => Body::Simple(SimpleString::decode(bytes)?),
            DocKind::IdDocument => Body::IdDocument(IdDocument::decode(bytes)?),
            DocKind::Order => Body::Order(OrderDocument::decode(bytes)?),
            DocKind::Policy => Body::Policy(Policy::decode(bytes)?),
        })
    }

    /// Run the field rules for this document.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        match self {
            Body::IdDocument(doc) => validate::id_document(doc),
            Body::Order(doc) => validate::order_document(doc),
            Body::Empty | Body::Simple(_) | Body::Policy(_) => Ok(()),
        }
    }

    pub fn into_simple(self) -> Result<SimpleString, EnvelopeError> {
        match self {
            Body::Simple(doc) => Ok(doc),
            other => Err(mismatch(DocKind::Simple, other.kind())),
        }
    }

    pub fn into_id_document(self) -> Result<IdDocument, EnvelopeError> {
        match self {
            Body::IdDocument(doc) => Ok(doc),
            other => Err(mismatch(DocKind::IdDocument, other.kind())),
        }
    }

    pub fn into_order(self) -> Result<OrderDocument, EnvelopeError> {
        match self {
            Body::Order(doc) => Ok(doc),
            other => Err(mismatch(DocKind::Order, other.kind())),
        }
    }
}

pub(crate) fn mismatch(expected: DocKind, found: DocKind) -> EnvelopeError {
    EnvelopeError::decode(format!(
        "expected {} document, found {}",
        expected.name(),
        found.name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_codes() {
        let codes: Vec<f32> = DocKind::ALL.iter().map(|k| k.type_code()).collect();
        assert_eq!(codes, vec![0.0, 1.0, 100.0, 101.0, 102.0]);
        for kind in DocKind::ALL {
            assert_eq!(DocKind::from_wire(kind.type_code(), kind.version()), Some(kind));
        }
        assert_eq!(DocKind::from_wire(2.0, 1.0), None);
        assert_eq!(DocKind::from_wire(101.0, 2.0), None);
    }

    #[test]
    fn test_parse_round_trip_and_mismatch() {
        let body = Body::Simple(SimpleString {
            content: "hello".into(),
        });
        let parsed = Body::parse(DocKind::Simple, &body.to_bytes()).unwrap();
        assert_eq!(parsed, body);
        assert!(matches!(
            parsed.into_order(),
            Err(EnvelopeError::DecodeFailure(_))
        ));
        assert!(Body::Empty.to_bytes().is_empty());
    }
}
