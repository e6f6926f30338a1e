//! `safeguardsecret`: the secret seals a plaintext supplied at deposit.
//!
//! The plaintext is ECIES-encrypted to the joint commitment as soon as it is
//! known and dropped from the order; only the holder of the reconstructed
//! private key can open it again.

use dta_04_envelope::OrderDocument;
use shared_crypto::{secp256k1_decrypt, secp256k1_encrypt, EciesCiphertext};

use super::ServicePlugin;
use crate::api::Extension;
use crate::errors::{ProtocolError, ProtocolResult};

pub(super) const PLUGIN_NAME: &str = "safeguardsecret";

const PLAIN_TEXT: &str = "plainText";
const CYPHER_TEXT: &str = "cypherText";
const EPHEMERAL: &str = "v";
const TAG: &str = "t";

pub struct SafeguardSecret;

impl ServicePlugin for SafeguardSecret {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn validate_order_request(&self, extension: &Extension) -> ProtocolResult<()> {
        match extension.get(PLAIN_TEXT) {
            Some(text) if !text.is_empty() => Ok(()),
            _ => Err(ProtocolError::validation("extension.plainText is required")),
        }
    }

    fn prepare_order_response(
        &self,
        order: &mut OrderDocument,
        commitment: &str,
    ) -> ProtocolResult<Extension> {
        let plain = order
            .order_req_extension
            .remove(PLAIN_TEXT)
            .ok_or_else(|| ProtocolError::violation("order carries no plainText"))?;
        let sealed = secp256k1_encrypt(plain.as_bytes(), commitment)?;
        Ok(Extension::from([
            (CYPHER_TEXT.to_string(), sealed.c),
            (EPHEMERAL.to_string(), sealed.v),
            (TAG.to_string(), sealed.t),
        ]))
    }

    fn produce_final_secret(
        &self,
        order: &OrderDocument,
        final_secret: &str,
        _commitment: &str,
    ) -> ProtocolResult<Extension> {
        let extension = order
            .order_part2
            .as_ref()
            .map(|part| &part.extension)
            .ok_or_else(|| ProtocolError::violation("order has no part 2"))?;
        let field = |name: &str| {
            extension
                .get(name)
                .cloned()
                .ok_or_else(|| ProtocolError::violation(format!("part 2 extension lacks {}", name)))
        };
        let sealed = EciesCiphertext {
            c: field(CYPHER_TEXT)?,
            v: field(EPHEMERAL)?,
            t: field(TAG)?,
        };
        let plain = secp256k1_decrypt(&sealed, final_secret)?;
        let plain = String::from_utf8(plain)
            .map_err(|_| ProtocolError::violation("sealed plaintext is not UTF-8"))?;
        Ok(Extension::from([(PLAIN_TEXT.to_string(), plain)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dta_04_envelope::OrderPart2;
    use shared_crypto::public_key_from_private;

    const SECRET: &str = "C70C9D95F4C1612C53886D2E07A2BAE5AA931F36C65E6AF13BFBA410A0CA1BD0";

    #[test]
    fn test_plaintext_required() {
        assert!(SafeguardSecret.validate_order_request(&Extension::new()).is_err());
        let empty = Extension::from([(PLAIN_TEXT.to_string(), String::new())]);
        assert!(SafeguardSecret.validate_order_request(&empty).is_err());
    }

    #[test]
    fn test_seal_then_open_with_final_key() {
        let (_, commitment) = public_key_from_private(SECRET).unwrap();
        let mut order = OrderDocument {
            order_req_extension: Extension::from([(
                PLAIN_TEXT.to_string(),
                "let me in".to_string(),
            )]),
            ..Default::default()
        };

        let extension = SafeguardSecret.prepare_order_response(&mut order, &commitment).unwrap();
        assert!(!order.order_req_extension.contains_key(PLAIN_TEXT));
        assert!(!extension.values().any(|v| v.contains("let me in")));

        order.order_part2 = Some(OrderPart2 {
            commitment_public_key: commitment.clone(),
            extension,
            ..Default::default()
        });
        let out = SafeguardSecret.produce_final_secret(&order, SECRET, &commitment).unwrap();
        assert_eq!(out[PLAIN_TEXT], "let me in");

        let wrong = "0000000000000000000000000000000000000000000000000000000000000001";
        assert!(SafeguardSecret.produce_final_secret(&order, wrong, &commitment).is_err());
    }
}
