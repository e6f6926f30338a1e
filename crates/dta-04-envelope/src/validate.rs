//! # Field Rules
//!
//! Checks run on every decoded envelope and document:
//!
//! - `SignedEnvelope`: signature longer than 20 bytes; signer CID-shaped or empty
//! - `Header`: at most [`MAX_RECIPIENTS`] recipients, each CID-shaped or empty
//! - `IDDocument`: timestamp inside the window
//! - `OrderDocument`: `coin` in `(-1, 999)`, CIDs, non-empty reference,
//!   timestamp, then each part that is present
//! - `OrderPart2..4`: `previous_order_cid` is a CID, a chain tx hash or empty;
//!   timestamp inside the window
//!
//! The header `datetime` is pinned to zero so CIDs stay deterministic; it is
//! not checked.

use shared_types::{is_cid_or_empty, is_tx_hash, timestamp_in_window};

use crate::errors::EnvelopeError;
use crate::proto::{Header, IdDocument, OrderDocument, SignedEnvelope};

/// Upper bound on wrapped keys per envelope.
pub const MAX_RECIPIENTS: usize = 20;

const MIN_SIGNATURE_LEN: usize = 21;

pub fn signed_envelope(envelope: &SignedEnvelope) -> Result<(), EnvelopeError> {
    if envelope.signature.len() < MIN_SIGNATURE_LEN {
        return Err(EnvelopeError::invalid(
            "signature",
            format!("length {} must be greater than 20", envelope.signature.len()),
        ));
    }
    cid("signer_cid", &envelope.signer_cid)
}

pub fn header(header: &Header) -> Result<(), EnvelopeError> {
    if header.recipients.len() > MAX_RECIPIENTS {
        return Err(EnvelopeError::invalid(
            "recipients",
            format!("{} recipients, at most {} allowed", header.recipients.len(), MAX_RECIPIENTS),
        ));
    }
    header
        .recipients
        .iter()
        .try_for_each(|r| cid("recipient.cid", &r.cid))
}

pub fn id_document(doc: &IdDocument) -> Result<(), EnvelopeError> {
    timestamp("timestamp", doc.timestamp)
}

pub fn order_document(doc: &OrderDocument) -> Result<(), EnvelopeError> {
    if !(doc.coin > -1 && doc.coin < 999) {
        return Err(EnvelopeError::invalid(
            "coin",
            format!("{} must be inside (-1, 999)", doc.coin),
        ));
    }
    cid("principal_cid", &doc.principal_cid)?;
    cid("beneficiary_cid", &doc.beneficiary_cid)?;
    if doc.reference.is_empty() {
        return Err(EnvelopeError::invalid("reference", "must not be empty"));
    }
    timestamp("timestamp", doc.timestamp)?;

    if let Some(part) = &doc.order_part2 {
        previous_order("order_part2.previous_order_cid", &part.previous_order_cid)?;
        timestamp("order_part2.timestamp", part.timestamp)?;
    }
    if let Some(part) = &doc.order_part3 {
        previous_order("order_part3.previous_order_cid", &part.previous_order_cid)?;
        timestamp("order_part3.timestamp", part.timestamp)?;
    }
    if let Some(part) = &doc.order_part4 {
        previous_order("order_part4.previous_order_cid", &part.previous_order_cid)?;
        timestamp("order_part4.timestamp", part.timestamp)?;
    }
    Ok(())
}

fn cid(field: &'static str, value: &str) -> Result<(), EnvelopeError> {
    if is_cid_or_empty(value) {
        Ok(())
    } else {
        Err(EnvelopeError::invalid(field, format!("'{}' is not a CID", value)))
    }
}

fn previous_order(field: &'static str, value: &str) -> Result<(), EnvelopeError> {
    if is_cid_or_empty(value) || is_tx_hash(value) {
        Ok(())
    } else {
        Err(EnvelopeError::invalid(
            field,
            format!("'{}' is neither a CID nor a tx hash", value),
        ))
    }
}

fn timestamp(field: &'static str, value: i64) -> Result<(), EnvelopeError> {
    if timestamp_in_window(value) {
        Ok(())
    } else {
        Err(EnvelopeError::invalid(field, format!("{} is outside the allowed window", value)))
    }
}
