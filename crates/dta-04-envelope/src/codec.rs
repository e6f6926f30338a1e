//! # Envelope Codec
//!
//! ## Encode
//!
//! 1. Stamp the header: version 1.0, `datetime = 0`, body type codes.
//! 2. If there is a secret body: fresh 32-byte AES key and 16-byte IV, PKCS#7
//!    to 32, AES-256-CBC. Wrap the key for every recipient with its own IV
//!    through the KEM.
//! 3. BLS-sign the serialized `Envelope` and wrap it in a `SignedEnvelope`.
//!
//! ## Decode
//!
//! Verify (when the sender key is known), parse, stamp `ipfs_id` with the
//! caller's tag, parse the plaintext body, unwrap and decrypt the secret body,
//! then run the field rules. A bad signature, a bad key unwrap and bad padding
//! all surface as [`EnvelopeError::VerificationFailure`].

use std::collections::BTreeMap;

use prost::Message;
use shared_crypto::{
    aes_cbc_decrypt, aes_cbc_encrypt, bls_sign, bls_verify, decapsulate_decrypt,
    encapsulate_encrypt, multihash_cid, pkcs7_pad, pkcs7_unpad, random_bytes,
};
use zeroize::Zeroizing;

use crate::body::{mismatch, Body, DocKind};
use crate::errors::EnvelopeError;
use crate::proto::{Envelope, Header, IdDocument, Recipient, SignedEnvelope};
use crate::validate::{self, MAX_RECIPIENTS};

/// Version stamped on every header and recipient entry.
pub const ENVELOPE_VERSION: f32 = 1.0;

/// PKCS#7 block length applied to secret bodies before encryption.
pub const SECRET_PAD_BLOCK: usize = 32;

const AES_KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

/// Readers of a secret body, keyed by their IDDoc CID.
pub type Recipients = BTreeMap<String, IdDocument>;

/// The reading node's identity for secret bodies.
#[derive(Clone, Copy)]
pub struct ReaderKeys<'a> {
    pub cid: &'a str,
    pub sike_sk: &'a [u8],
}

/// Result of [`decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub header: Header,
    pub body: Body,
    pub secret: Body,
}

/// Build a signed envelope.
///
/// `header` may carry `previous_cid`; every other header field is overwritten.
pub fn encode(
    node_cid: &str,
    body: &Body,
    secret: &Body,
    mut header: Header,
    bls_sk: &[u8],
    recipients: &Recipients,
) -> Result<Vec<u8>, EnvelopeError> {
    header.version = ENVELOPE_VERSION;
    header.datetime = 0;
    header.body_type_code = body.kind().type_code();
    header.body_version = body.kind().version();
    header.encrypted_body_type_code = secret.kind().type_code();
    header.encrypted_body_version = secret.kind().version();
    header.recipients.clear();
    header.encrypted_body_iv.clear();

    let mut encrypted_body = Vec::new();
    if !secret.is_empty() {
        if recipients.len() > MAX_RECIPIENTS {
            return Err(EnvelopeError::invalid(
                "recipients",
                format!("{} recipients, at most {} allowed", recipients.len(), MAX_RECIPIENTS),
            ));
        }
        let aes_key = Zeroizing::new(random_bytes(AES_KEY_LEN));
        let iv = random_bytes(IV_LEN);
        let padded = Zeroizing::new(pkcs7_pad(&secret.to_bytes(), SECRET_PAD_BLOCK));
        encrypted_body = aes_cbc_encrypt(&aes_key[..], &iv, &padded[..])?;

        for (cid, iddoc) in recipients {
            let recipient_iv = random_bytes(IV_LEN);
            let (ciphertext, encapsulated_key) =
                encapsulate_encrypt(&aes_key[..], &recipient_iv, &iddoc.sike_public_key)?;
            header.recipients.push(Recipient {
                version: ENVELOPE_VERSION,
                cid: cid.clone(),
                encapsulated_key,
                ciphertext,
                iv: recipient_iv,
            });
        }
        header.encrypted_body_iv = iv;
    }

    let envelope = Envelope {
        header: Some(header),
        body: body.to_bytes(),
        encrypted_body,
    };
    let message = envelope.encode_to_vec();
    let signature = bls_sign(&message, bls_sk)?;

    Ok(SignedEnvelope {
        signature,
        signer_cid: node_cid.to_string(),
        message,
    }
    .encode_to_vec())
}

/// Open a signed envelope.
///
/// `expect_body`/`expect_secret` name the document each part must hold;
/// [`DocKind::Empty`] skips that part. `reader` is required for a secret.
pub fn decode(
    raw: &[u8],
    tag: &str,
    reader: Option<ReaderKeys<'_>>,
    expect_body: DocKind,
    expect_secret: DocKind,
    sender_bls_pk: Option<&[u8]>,
) -> Result<Decoded, EnvelopeError> {
    let signed = SignedEnvelope::decode(raw)?;
    validate::signed_envelope(&signed)?;
    if let Some(pk) = sender_bls_pk {
        bls_verify(&signed.message, pk, &signed.signature)
            .map_err(|_| EnvelopeError::VerificationFailure)?;
    }

    let envelope = Envelope::decode(signed.message.as_slice())?;
    let mut header = envelope.header.unwrap_or_default();
    validate::header(&header)?;
    header.ipfs_id = tag.to_string();

    let body = if expect_body == DocKind::Empty {
        Body::Empty
    } else {
        let kind = wire_kind(header.body_type_code, header.body_version)?;
        if kind != expect_body {
            return Err(mismatch(expect_body, kind));
        }
        Body::parse(kind, &envelope.body)?
    };

    let secret = if expect_secret == DocKind::Empty {
        Body::Empty
    } else {
        let kind = wire_kind(header.encrypted_body_type_code, header.encrypted_body_version)?;
        if kind != expect_secret {
            return Err(mismatch(expect_secret, kind));
        }
        let reader = reader.ok_or_else(|| EnvelopeError::decode("no reader keys for secret body"))?;
        let plaintext = open_secret(&header, &envelope.encrypted_body, reader)?;
        Body::parse(kind, &plaintext)?
    };

    body.validate()?;
    secret.validate()?;
    tracing::trace!(
        signer = %signed.signer_cid,
        body = body.kind().name(),
        secret = secret.kind().name(),
        "decoded envelope"
    );
    Ok(Decoded {
        header,
        body,
        secret,
    })
}

fn wire_kind(type_code: f32, version: f32) -> Result<DocKind, EnvelopeError> {
    DocKind::from_wire(type_code, version).ok_or_else(|| {
        EnvelopeError::decode(format!("unknown document type {} v{}", type_code, version))
    })
}

fn open_secret(
    header: &Header,
    encrypted_body: &[u8],
    reader: ReaderKeys<'_>,
) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
    let recipient = header
        .recipients
        .iter()
        .find(|r| r.cid == reader.cid)
        .ok_or_else(|| EnvelopeError::RecipientNotFound(reader.cid.to_string()))?;

    let aes_key = Zeroizing::new(
        decapsulate_decrypt(
            &recipient.ciphertext,
            &recipient.iv,
            reader.sike_sk,
            &recipient.encapsulated_key,
        )
        .map_err(|_| EnvelopeError::VerificationFailure)?,
    );
    let padded = Zeroizing::new(
        aes_cbc_decrypt(&aes_key[..], &header.encrypted_body_iv, encrypted_body)
            .map_err(|_| EnvelopeError::VerificationFailure)?,
    );
    pkcs7_unpad(&padded[..], SECRET_PAD_BLOCK)
        .map(Zeroizing::new)
        .map_err(|_| EnvelopeError::VerificationFailure)
}

/// Check the BLS signature on an encoded envelope.
pub fn verify(raw: &[u8], bls_pk: &[u8]) -> Result<(), EnvelopeError> {
    let signed = SignedEnvelope::decode(raw)?;
    bls_verify(&signed.message, bls_pk, &signed.signature).map_err(|_| EnvelopeError::VerificationFailure)
}

/// Signer CID of an envelope, read without verifying or decrypting.
pub fn peek_signer(raw: &[u8]) -> Result<String, EnvelopeError> {
    Ok(SignedEnvelope::decode(raw)?.signer_cid)
}

/// Content address of an encoded envelope.
pub fn envelope_cid(raw: &[u8]) -> String {
    multihash_cid(raw)
}
