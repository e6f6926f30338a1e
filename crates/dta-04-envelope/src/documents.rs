//! Typed entry points for the documents the protocol exchanges.

use shared_crypto::CryptoError;

use crate::body::{Body, DocKind};
use crate::codec::{decode, encode, verify, ReaderKeys, Recipients};
use crate::errors::EnvelopeError;
use crate::proto::{Header, IdDocument, OrderDocument, SimpleString};

/// Self-signed, unencrypted IDDoc envelope. Deterministic for a given document and key.
pub fn encode_iddoc(iddoc: &IdDocument, bls_sk: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    encode(
        "",
        &Body::IdDocument(iddoc.clone()),
        &Body::Empty,
        Header::default(),
        bls_sk,
        &Recipients::new(),
    )
}

/// Decode an IDDoc and check its signature against the BLS key it carries.
pub fn decode_iddoc(raw: &[u8], tag: &str) -> Result<(Header, IdDocument), EnvelopeError> {
    let decoded = decode(raw, tag, None, DocKind::IdDocument, DocKind::Empty, None)?;
    let iddoc = decoded.body.into_id_document()?;
    if iddoc.bls_public_key.is_empty() {
        return Err(EnvelopeError::CryptoFailure(CryptoError::InvalidPublicKey));
    }
    verify(raw, &iddoc.bls_public_key)?;
    Ok((decoded.header, iddoc))
}

/// Seal an order for `recipients`, linking it to `previous_cid`.
pub fn encode_order(
    node_cid: &str,
    order: &OrderDocument,
    previous_cid: &str,
    bls_sk: &[u8],
    recipients: &Recipients,
) -> Result<Vec<u8>, EnvelopeError> {
    let header = Header {
        previous_cid: previous_cid.to_string(),
        ..Default::default()
    };
    encode(
        node_cid,
        &Body::Empty,
        &Body::Order(order.clone()),
        header,
        bls_sk,
        recipients,
    )
}

/// Open an order addressed to `reader`.
pub fn decode_order(
    raw: &[u8],
    tag: &str,
    reader: ReaderKeys<'_>,
    sender_bls_pk: Option<&[u8]>,
) -> Result<(Header, OrderDocument), EnvelopeError> {
    let decoded = decode(
        raw,
        tag,
        Some(reader),
        DocKind::Empty,
        DocKind::Order,
        sender_bls_pk,
    )?;
    Ok((decoded.header, decoded.secret.into_order()?))
}

/// Seal a single string for `recipients`.
pub fn encode_secret_string(
    node_cid: &str,
    content: &str,
    bls_sk: &[u8],
    recipients: &Recipients,
) -> Result<Vec<u8>, EnvelopeError> {
    let secret = Body::Simple(SimpleString {
        content: content.to_string(),
    });
    encode(node_cid, &Body::Empty, &secret, Header::default(), bls_sk, recipients)
}

/// Open a string sealed with [`encode_secret_string`].
pub fn decode_secret_string(
    raw: &[u8],
    reader: ReaderKeys<'_>,
    sender_bls_pk: Option<&[u8]>,
) -> Result<String, EnvelopeError> {
    let decoded = decode(raw, "", Some(reader), DocKind::Empty, DocKind::Simple, sender_bls_pk)?;
    Ok(decoded.secret.into_simple()?.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::TestNode;
    use crate::proto::{OrderPart2, OrderPart3, OrderPart4};

    const NOW: i64 = 1_700_000_000;

    fn full_order(principal: &str) -> OrderDocument {
        OrderDocument {
            r#type: "Safeguard_Secret".into(),
            reference: "9b2f3c64-2f44-4a7a-9d11-8f5a6e9c1a20".into(),
            principal_cid: principal.into(),
            timestamp: NOW,
            order_part2: Some(OrderPart2 {
                commitment_public_key: "2CommitmentPublicKey".into(),
                previous_order_cid: "ab".repeat(32),
                timestamp: NOW,
                ..Default::default()
            }),
            order_part3: Some(OrderPart3 {
                redemption: "3Redemption".into(),
                previous_order_cid: "cd".repeat(32),
                beneficiary_encrypted_data: b"3BeneficiaryEncryptedData".to_vec(),
                timestamp: NOW,
                ..Default::default()
            }),
            order_part4: Some(OrderPart4 {
                secret: "4Secret".into(),
                previous_order_cid: "ef".repeat(32),
                timestamp: NOW,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_order_round_trip() {
        let alice = TestNode::new(1);
        let order = full_order(&alice.cid);
        let raw = encode_order(
            &alice.cid,
            &order,
            "prev-tx",
            &alice.bls_sk,
            &TestNode::recipients(&[&alice]),
        )
        .unwrap();

        let (header, decoded) =
            decode_order(&raw, "NEW IPFS ID", alice.reader(), Some(&alice.bls_pk)).unwrap();
        assert_eq!(decoded, order);
        assert_eq!(header.ipfs_id, "NEW IPFS ID");
        assert_eq!(header.previous_cid, "prev-tx");
    }

    #[test]
    fn test_invalid_order_rejected_after_decrypt() {
        let alice = TestNode::new(1);
        let mut order = full_order(&alice.cid);
        order.reference.clear();
        let raw = encode_order(&alice.cid, &order, "", &alice.bls_sk, &TestNode::recipients(&[&alice]))
            .unwrap();
        assert!(matches!(
            decode_order(&raw, "", alice.reader(), None),
            Err(EnvelopeError::Invalid { field: "reference", .. })
        ));
    }

    #[test]
    fn test_iddoc_self_verifies() {
        let alice = TestNode::new(1);
        let raw = encode_iddoc(&alice.iddoc, &alice.bls_sk).unwrap();
        let (_, iddoc) = decode_iddoc(&raw, "tag").unwrap();
        assert_eq!(iddoc, alice.iddoc);

        // Signed by someone other than the key inside.
        let mallory = TestNode::new(4);
        let forged = encode_iddoc(&alice.iddoc, &mallory.bls_sk).unwrap();
        assert!(matches!(
            decode_iddoc(&forged, "tag"),
            Err(EnvelopeError::VerificationFailure)
        ));
    }

    #[test]
    fn test_secret_string_for_one_reader() {
        let alice = TestNode::new(1);
        let bob = TestNode::new(2);
        let raw = encode_secret_string(&alice.cid, "deadbeef", &alice.bls_sk, &TestNode::recipients(&[&bob]))
            .unwrap();
        assert_eq!(
            decode_secret_string(&raw, bob.reader(), Some(&alice.bls_pk)).unwrap(),
            "deadbeef"
        );
        assert!(matches!(
            decode_secret_string(&raw, alice.reader(), None),
            Err(EnvelopeError::RecipientNotFound(_))
        ));
    }
}
