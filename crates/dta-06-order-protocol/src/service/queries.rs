//! Read-only views over the order book.

use dta_04_envelope::BeneficiaryType;

use super::OrderService;
use crate::api::OrderView;
use crate::errors::ProtocolResult;

fn beneficiary_type_name(kind: BeneficiaryType) -> &'static str {
    match kind {
        BeneficiaryType::Unspecified => "unspecified",
        BeneficiaryType::KnownAtStart => "known_at_start",
        BeneficiaryType::UnknownAtStart => "unknown_at_start",
    }
}

impl OrderService {
    /// Decode the latest transaction this node holds for `reference`.
    ///
    /// The principal's joint commitment and the beneficiary's final-key
    /// extension are overlaid when this node has them.
    pub async fn get_order(&self, reference: &str) -> ProtocolResult<OrderView> {
        let tx_hash = self.book.order_tx(reference)?;
        let tx = self.chain.get_tx(&tx_hash).await?;
        let (_, mut order) = self.open(&tx).await?;

        if let Ok(committed) = self.book.part2(reference) {
            if order.order_part3.is_none() {
                order.order_part2 = committed.order_part2;
            }
        }
        let mut extension = order
            .order_part2
            .as_ref()
            .map(|part| part.extension.clone())
            .unwrap_or_default();
        if let Ok(final_key) = self.book.final_key(reference) {
            extension.extend(final_key.extension);
        }

        Ok(OrderView {
            order_reference: order.reference.clone(),
            tx_hash,
            state: self.book.state(reference)?.to_string(),
            principal_cid: order.principal_cid.clone(),
            beneficiary_cid: order.beneficiary_cid.clone(),
            beneficiary_type: beneficiary_type_name(order.beneficiary_kind()).to_string(),
            plugin: order.r#type.clone(),
            coin: order.coin,
            commitment: order
                .order_part2
                .as_ref()
                .map(|part| part.commitment_public_key.clone()),
            created_at: order.timestamp,
            extension,
        })
    }
}
