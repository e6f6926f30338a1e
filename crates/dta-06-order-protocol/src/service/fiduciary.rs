//! Fiduciary: answer part 1 with a share commitment, part 3 with the share.

use dta_04_envelope::{encode_order, OrderPart2, OrderPart4};
use shared_crypto::{random_bytes, redeem_public_key, redeem_secret};
use shared_types::{BlockChainTX, Processor};

use super::{now, require_part, OrderService, SHARE_SEED_LEN};
use crate::errors::{ProtocolError, ProtocolResult};
use crate::ports::Outcome;

impl OrderService {
    /// Part 1 arrived: draw a share seed and post its public key as part 2.
    pub async fn on_request(&self, tx: &BlockChainTX) -> ProtocolResult<Outcome> {
        let reference = tx.reference();
        if !self.book.is_fresh(reference, Processor::FulfillRequest)? {
            return Ok(Outcome::Ignored("stale fulfill_request"));
        }
        let (_, mut order) = self.open(tx).await?;
        if order.principal_cid != tx.sender_id {
            return Err(ProtocolError::violation(format!(
                "order {} names principal {} but was sent by {}",
                reference, order.principal_cid, tx.sender_id
            )));
        }
        if order.order_part2.is_some() {
            return Err(ProtocolError::violation(format!(
                "order {} already carries part 2",
                reference
            )));
        }

        let seed = random_bytes(SHARE_SEED_LEN);
        let commitment = redeem_public_key(&hex::encode(&seed))?;
        order.order_part2 = Some(OrderPart2 {
            commitment_public_key: commitment,
            previous_order_cid: tx.tx_hash.clone(),
            timestamp: now(),
            ..Default::default()
        });

        let principal = order.principal_cid.as_str();
        let recipients = self.recipients(&[principal, self.node.cid.as_str()]).await?;
        let raw = encode_order(
            &self.node.cid,
            &order,
            &tx.tx_hash,
            self.keyring.bls_secret_key(),
            &recipients,
        )?;
        let posted = self
            .post(Processor::FulfillResponse, principal, reference, raw)
            .await?;

        self.book.save_seed(reference, &seed)?;
        self.book.save_order_tx(reference, &posted, order.timestamp)?;
        self.book.advance(reference, Processor::FulfillRequest)?;
        Ok(Outcome::Posted(posted))
    }

    /// Part 3 arrived: release this node's share to the beneficiary as part 4.
    pub async fn on_secret_request(&self, tx: &BlockChainTX) -> ProtocolResult<Outcome> {
        let reference = tx.reference();
        if !self.book.is_fresh(reference, Processor::FulfillSecretRequest)? {
            return Ok(Outcome::Ignored("stale fulfill_secret_request"));
        }
        let (_, mut order) = self.open(tx).await?;
        if order.principal_cid != tx.sender_id {
            return Err(ProtocolError::violation(format!(
                "redemption of {} sent by {}, not its principal",
                reference, tx.sender_id
            )));
        }
        let part3 = require_part(&order.order_part3, "part 3", reference)?;
        let answered = self
            .check_link(&part3.previous_order_cid, Processor::FulfillResponse, reference)
            .await?;
        if answered.sender_id != self.node.cid {
            return Err(ProtocolError::violation(format!(
                "order {} was committed by {}, not this node",
                reference, answered.sender_id
            )));
        }
        if order.beneficiary_cid.is_empty() {
            return Err(ProtocolError::violation(format!(
                "order {} reached redemption without a beneficiary",
                reference
            )));
        }

        let seed = self.book.seed(reference)?;
        let secret = redeem_secret(&hex::encode(&seed))?;
        order.order_part4 = Some(OrderPart4 {
            secret,
            previous_order_cid: tx.tx_hash.clone(),
            timestamp: now(),
            ..Default::default()
        });

        let beneficiary = order.beneficiary_cid.as_str();
        let recipients = self.recipients(&[self.node.cid.as_str(), beneficiary]).await?;
        let raw = encode_order(
            &self.node.cid,
            &order,
            &tx.tx_hash,
            self.keyring.bls_secret_key(),
            &recipients,
        )?;
        let posted = self
            .post(Processor::FulfillSecretResponse, beneficiary, reference, raw)
            .await?;

        self.book.save_order_tx(reference, &posted, order.timestamp)?;
        self.book.advance(reference, Processor::FulfillSecretRequest)?;
        Ok(Outcome::Posted(posted))
    }
}
