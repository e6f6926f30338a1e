//! Beneficiary: rebuild the final key from both shares.

use dta_04_envelope::{decode_secret_string, BeneficiaryType};
use shared_crypto::{ec_add_priv, public_key_from_private};
use shared_types::{BlockChainTX, Processor};
use zeroize::Zeroizing;

use super::{require_part, OrderService};
use crate::api::FinalKey;
use crate::errors::{ProtocolError, ProtocolResult};
use crate::ports::Outcome;

impl OrderService {
    /// Part 4 arrived: add the principal's share to the fiduciary's, check
    /// the sum against the joint commitment and hand it to the plugin.
    pub async fn on_secret_response(&self, tx: &BlockChainTX) -> ProtocolResult<Outcome> {
        let reference = tx.reference();
        if !self.book.is_fresh(reference, Processor::FulfillSecretResponse)? {
            return Ok(Outcome::Ignored("stale fulfill_secret_response"));
        }
        let (_, order) = self.open(tx).await?;
        if order.beneficiary_cid != self.node.cid {
            return Err(ProtocolError::BeneficiaryMismatch(format!(
                "order {} is for {}",
                reference, order.beneficiary_cid
            )));
        }
        let part2 = require_part(&order.order_part2, "part 2", reference)?;
        let part3 = require_part(&order.order_part3, "part 3", reference)?;
        let part4 = require_part(&order.order_part4, "part 4", reference)?;
        self.check_link(&part4.previous_order_cid, Processor::FulfillSecretRequest, reference)
            .await?;

        let principal_share = Zeroizing::new(match order.beneficiary_kind() {
            BeneficiaryType::KnownAtStart => self.keyring.ec_secret_key().to_string(),
            BeneficiaryType::UnknownAtStart => {
                let principal = self.iddoc(&order.principal_cid).await?;
                decode_secret_string(
                    &part3.beneficiary_encrypted_data,
                    self.keyring.reader(&self.node.cid),
                    Some(&principal.bls_public_key),
                )?
            }
            BeneficiaryType::Unspecified => {
                return Err(ProtocolError::violation(format!(
                    "order {} has no beneficiary type",
                    reference
                )))
            }
        });
        let final_secret = Zeroizing::new(ec_add_priv(&principal_share, &part4.secret)?);
        let (_, public_key) = public_key_from_private(&final_secret)?;
        if !public_key.eq_ignore_ascii_case(&part2.commitment_public_key) {
            return Err(ProtocolError::violation(format!(
                "reconstructed key for {} does not match commitment {}",
                reference, part2.commitment_public_key
            )));
        }

        let extension = self
            .plugin_for(&order)?
            .produce_final_secret(&order, &final_secret, &public_key)?;
        self.book.save_final_key(&FinalKey {
            order_reference: reference.to_string(),
            commitment: public_key.clone(),
            extension,
        })?;
        self.book.save_order_tx(reference, &tx.tx_hash, order.timestamp)?;
        self.book.advance(reference, Processor::FulfillSecretResponse)?;
        tracing::info!(reference, commitment = %public_key, "final key reconstructed");
        Ok(Outcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{OrderRequest, OrderSecretRequest};
    use crate::service::tests::Federation;
    use crate::service::OrderService;
    use shared_types::NodeType;

    struct Redeemed {
        fed: Federation,
        principal: OrderService,
        fiduciary: OrderService,
        beneficiary: OrderService,
        reference: String,
    }

    /// Run a deposit and redemption up to the posting of part 4.
    async fn redeem(known_at_start: bool, plugin: &str, extension: &[(&str, &str)]) -> Redeemed {
        let fed = Federation::new();
        let fiduciary = fed.node(2, NodeType::MasterFiduciary, "", plugin).await;
        let principal = fed
            .node(1, NodeType::Principal, &fiduciary.node().cid, plugin)
            .await;
        let beneficiary = fed.node(3, NodeType::Multi, "", plugin).await;
        let beneficiary_cid = beneficiary.node().cid.clone();
        let extension: crate::api::Extension = extension
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let deposit = principal
            .start_deposit(OrderRequest {
                beneficiary_id_document_cid: known_at_start.then(|| beneficiary_cid.clone()),
                extension,
            })
            .await
            .unwrap();
        fiduciary.on_request(&fed.last_tx()).await.unwrap();
        assert_eq!(
            principal.on_fulfill_response(&fed.last_tx()).await.unwrap(),
            Outcome::Completed
        );
        principal
            .start_redemption(OrderSecretRequest {
                order_reference: deposit.order_reference.clone(),
                beneficiary_id_document_cid: (!known_at_start).then_some(beneficiary_cid),
                ..Default::default()
            })
            .await
            .unwrap();
        fiduciary.on_secret_request(&fed.last_tx()).await.unwrap();

        Redeemed {
            fed,
            principal,
            fiduciary,
            beneficiary,
            reference: deposit.order_reference,
        }
    }

    #[tokio::test]
    async fn test_known_at_start_reconstruction() {
        let r = redeem(true, "bitcoinwallet", &[("coin", "0")]).await;
        let part4 = r.fed.last_tx();
        assert_eq!(part4.recipient_id, r.beneficiary.node().cid);
        assert_eq!(
            r.beneficiary.on_secret_response(&part4).await.unwrap(),
            Outcome::Completed
        );

        let final_key = r.beneficiary.book().final_key(&r.reference).unwrap();
        let committed = r.principal.book().part2(&r.reference).unwrap();
        assert_eq!(
            final_key.commitment,
            committed.order_part2.unwrap().commitment_public_key
        );
        assert_eq!(final_key.extension["address"], committed_address(&r));
        assert!(final_key.extension["privatekey"].starts_with('K')
            || final_key.extension["privatekey"].starts_with('L'));

        // Redelivery changes nothing.
        assert!(matches!(
            r.beneficiary.on_secret_response(&part4).await.unwrap(),
            Outcome::Ignored(_)
        ));
    }

    fn committed_address(r: &Redeemed) -> String {
        r.principal
            .book()
            .part2(&r.reference)
            .unwrap()
            .order_part2
            .unwrap()
            .extension["address"]
            .clone()
    }

    #[tokio::test]
    async fn test_unknown_at_start_reconstruction_opens_plaintext() {
        let r = redeem(false, "safeguardsecret", &[("plainText", "vault combination")]).await;
        r.beneficiary.on_secret_response(&r.fed.last_tx()).await.unwrap();

        let final_key = r.beneficiary.book().final_key(&r.reference).unwrap();
        assert_eq!(final_key.extension["plainText"], "vault combination");

        let view = r.beneficiary.get_order(&r.reference).await.unwrap();
        assert_eq!(view.state, "fulfill_secret_response");
        assert_eq!(view.beneficiary_type, "unknown_at_start");
        assert_eq!(view.commitment.as_deref(), Some(final_key.commitment.as_str()));
    }

    #[tokio::test]
    async fn test_part4_for_another_beneficiary_refused() {
        let r = redeem(true, "safeguardsecret", &[("plainText", "x")]).await;
        // The fiduciary can read part 4 but is not its beneficiary.
        let err = r.fiduciary.on_secret_response(&r.fed.last_tx()).await.unwrap_err();
        assert!(matches!(err, ProtocolError::BeneficiaryMismatch(_)));
    }
}
