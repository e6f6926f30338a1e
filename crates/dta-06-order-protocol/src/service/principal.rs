//! Principal: parts 1 and 3, and the joint commitment on receipt of part 2.

use dta_04_envelope::{
    encode_order, encode_secret_string, BeneficiaryType, OrderDocument, OrderPart3, Recipients,
};
use shared_crypto::{ec_add_pub, random_bytes, redeem_secret};
use shared_types::{is_cid, BlockChainTX, Processor};

use super::{now, require_part, share_entropy, OrderService, SHARE_SEED_LEN};
use crate::api::{OrderRequest, OrderResponse, OrderSecretRequest};
use crate::errors::{ProtocolError, ProtocolResult};
use crate::ports::Outcome;

/// Fixed `redemption` marker in part 3.
const REDEMPTION_MARKER: &str = "SignedReferenceNumber";

fn supplied_beneficiary(cid: Option<String>) -> ProtocolResult<Option<String>> {
    match cid.filter(|c| !c.is_empty()) {
        Some(c) if !is_cid(&c) => Err(ProtocolError::validation(format!(
            "beneficiary '{}' is not a CID",
            c
        ))),
        other => Ok(other),
    }
}

impl OrderService {
    fn require_originator(&self) -> ProtocolResult<()> {
        if self.node.node_type.can_originate() {
            Ok(())
        } else {
            Err(ProtocolError::violation(format!(
                "a {} node does not originate orders",
                self.node.node_type.as_str()
            )))
        }
    }

    /// Create an order and post part 1 to the master fiduciary.
    pub async fn start_deposit(&self, request: OrderRequest) -> ProtocolResult<OrderResponse> {
        self.require_originator()?;
        let fiduciary = self.node.master_fiduciary_cid.as_str();
        if fiduciary.is_empty() || fiduciary == self.node.cid {
            return Err(ProtocolError::violation(
                "master fiduciary must be set and differ from this node",
            ));
        }
        self.plugin.validate_order_request(&request.extension)?;
        let beneficiary = supplied_beneficiary(request.beneficiary_id_document_cid)?;

        if let Some(b) = beneficiary.as_deref() {
            // Fail before posting if the beneficiary never published an IDDoc.
            self.iddoc(b).await?;
        }
        let recipients = self.recipients(&[self.node.cid.as_str(), fiduciary]).await?;

        let seed = random_bytes(SHARE_SEED_LEN);
        let mut order = OrderDocument {
            r#type: self.plugin.name().to_string(),
            principal_cid: self.node.cid.clone(),
            beneficiary_cid: beneficiary.clone().unwrap_or_default(),
            reference: uuid::Uuid::new_v4().to_string(),
            timestamp: now(),
            order_req_extension: request.extension.clone(),
            ..Default::default()
        };
        order.set_beneficiary_type(if beneficiary.is_some() {
            BeneficiaryType::KnownAtStart
        } else {
            BeneficiaryType::UnknownAtStart
        });
        self.plugin.prepare_order_part1(&mut order, &request.extension)?;

        let raw = encode_order(
            &self.node.cid,
            &order,
            "",
            self.keyring.bls_secret_key(),
            &recipients,
        )?;
        let tx_hash = self
            .post(Processor::FulfillRequest, fiduciary, &order.reference, raw)
            .await?;

        self.book.save_seed(&order.reference, &seed)?;
        self.book
            .save_order_tx(&order.reference, &tx_hash, order.timestamp)?;
        self.book.advance(&order.reference, Processor::FulfillRequest)?;

        Ok(OrderResponse {
            order_reference: order.reference,
            tx_hash,
            created_at: order.timestamp,
        })
    }

    /// Part 2 arrived: combine both share keys into the joint commitment.
    pub async fn on_fulfill_response(&self, tx: &BlockChainTX) -> ProtocolResult<Outcome> {
        let reference = tx.reference();
        if !self.book.is_fresh(reference, Processor::FulfillResponse)? {
            return Ok(Outcome::Ignored("stale fulfill_response"));
        }
        let (_, mut order) = self.open(tx).await?;
        if order.principal_cid != self.node.cid {
            return Err(ProtocolError::violation(format!(
                "order {} belongs to principal {}",
                reference, order.principal_cid
            )));
        }
        let part2 = require_part(&order.order_part2, "part 2", reference)?.clone();
        let part1_tx = self.book.order_tx(reference)?;
        if part2.previous_order_cid != part1_tx {
            return Err(ProtocolError::violation(format!(
                "part 2 of {} answers {} instead of {}",
                reference, part2.previous_order_cid, part1_tx
            )));
        }

        let seed = self.book.seed(reference)?;
        let principal_key = self
            .principal_share_public_key(&order, &seed, &part2.previous_order_cid)
            .await?;
        let commitment = ec_add_pub(&part2.commitment_public_key, &principal_key)?;

        let plugin = self.plugin_for(&order)?;
        let extension = plugin.prepare_order_response(&mut order, &commitment)?;
        if let Some(part) = order.order_part2.as_mut() {
            part.commitment_public_key = commitment.clone();
            part.extension.extend(extension);
        }

        self.book.save_part2(reference, &order)?;
        self.book.save_order_tx(reference, &tx.tx_hash, order.timestamp)?;
        self.book.advance(reference, Processor::FulfillResponse)?;
        tracing::info!(
            reference,
            tx_hash = %tx.tx_hash,
            commitment = %commitment,
            "deposit committed"
        );
        Ok(Outcome::Completed)
    }

    /// Post part 3 asking the fiduciary to release its share.
    pub async fn start_redemption(&self, request: OrderSecretRequest) -> ProtocolResult<OrderResponse> {
        self.require_originator()?;
        let reference = request.order_reference.as_str();
        let previous = self.book.order_tx(reference)?;
        let state = self.book.state(reference)?;
        if state != Processor::FulfillResponse {
            return Err(ProtocolError::violation(format!(
                "order {} is at {}, expected {}",
                reference,
                state,
                Processor::FulfillResponse
            )));
        }

        let part2_tx = self.chain.get_tx(&previous).await?;
        let (_, mut order) = self.open(&part2_tx).await?;
        let committed = self.book.part2(reference)?;
        order.order_part2 = committed.order_part2;
        order.order_req_extension = committed.order_req_extension;

        let plugin = self.plugin_for(&order)?;
        plugin.validate_order_secret_request(&order, &request.extension)?;

        match (
            order.beneficiary_cid.is_empty(),
            supplied_beneficiary(request.beneficiary_id_document_cid)?,
        ) {
            (true, None) => {
                return Err(ProtocolError::BeneficiaryMismatch(
                    "beneficiary must be supplied".into(),
                ))
            }
            (false, Some(b)) if b != order.beneficiary_cid => {
                return Err(ProtocolError::BeneficiaryMismatch(format!(
                    "order names {}, request names {}",
                    order.beneficiary_cid, b
                )))
            }
            (true, Some(b)) => order.beneficiary_cid = b,
            _ => {}
        }
        order.order_secret_req_extension = request.extension;

        let beneficiary_encrypted_data = match order.beneficiary_kind() {
            BeneficiaryType::UnknownAtStart => {
                let modifier = &require_part(&order.order_part2, "part 2", reference)?
                    .previous_order_cid;
                let seed = self.book.seed(reference)?;
                let share = redeem_secret(&share_entropy(&seed, modifier))?;
                let mut to = Recipients::new();
                to.insert(
                    order.beneficiary_cid.clone(),
                    self.iddoc(&order.beneficiary_cid).await?,
                );
                encode_secret_string(&self.node.cid, &share, self.keyring.bls_secret_key(), &to)?
            }
            _ => Vec::new(),
        };
        order.order_part3 = Some(OrderPart3 {
            redemption: REDEMPTION_MARKER.to_string(),
            previous_order_cid: previous.clone(),
            beneficiary_encrypted_data,
            timestamp: now(),
            ..Default::default()
        });

        let fiduciary = part2_tx.sender_id.as_str();
        let recipients = self.recipients(&[self.node.cid.as_str(), fiduciary]).await?;
        let raw = encode_order(
            &self.node.cid,
            &order,
            &previous,
            self.keyring.bls_secret_key(),
            &recipients,
        )?;
        let tx_hash = self
            .post(Processor::FulfillSecretRequest, fiduciary, reference, raw)
            .await?;

        self.book.save_order_tx(reference, &tx_hash, order.timestamp)?;
        self.book.advance(reference, Processor::FulfillSecretRequest)?;

        Ok(OrderResponse {
            order_reference: order.reference,
            tx_hash,
            created_at: order.timestamp,
        })
    }
}
