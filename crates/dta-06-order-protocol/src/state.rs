//! # Order Book
//!
//! Per-reference records the protocol keeps in the local store.
//!
//! | Datatype | Key | Value |
//! |----------|-----|-------|
//! | `keySeed` | reference | hex seed of this node's share |
//! | `order` | reference | hash of the latest chain tx for the order, `time` index |
//! | `orderPart2` | reference | principal's order with the joint commitment (protobuf) |
//! | `orderState` | reference | highest processor seen |
//! | `finalKey` | reference | beneficiary's reconstruction result (JSON) |
//!
//! Writes happen only after the matching `post_tx` has returned.

use dta_01_local_store::{IndexMap, LocalStore, LocalStoreError};
use dta_04_envelope::OrderDocument;
use prost::Message;
use shared_types::Processor;

use crate::api::FinalKey;
use crate::errors::{ProtocolError, ProtocolResult};

pub const KEY_SEED: &str = "keySeed";
pub const ORDER: &str = "order";
pub const ORDER_PART2: &str = "orderPart2";
pub const ORDER_STATE: &str = "orderState";
pub const FINAL_KEY: &str = "finalKey";

/// Secondary index on `order` records.
pub const TIME_INDEX: &str = "time";

#[derive(Clone)]
pub struct OrderBook {
    store: LocalStore,
}

impl OrderBook {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn save_seed(&self, reference: &str, seed: &[u8]) -> ProtocolResult<()> {
        self.store
            .set_string(KEY_SEED, reference, &hex::encode(seed), &IndexMap::new())?;
        Ok(())
    }

    /// Seed of this node's share; [`ProtocolError::MissingSeed`] when missing.
    pub fn seed(&self, reference: &str) -> ProtocolResult<Vec<u8>> {
        let encoded = match self.store.get_string(KEY_SEED, reference) {
            Ok(encoded) => encoded,
            Err(LocalStoreError::KeyNotFound { .. }) => {
                return Err(ProtocolError::MissingSeed {
                    reference: reference.to_string(),
                })
            }
            Err(e) => return Err(ProtocolError::Store(e)),
        };
        hex::decode(encoded).map_err(|e| {
            ProtocolError::Store(LocalStoreError::Codec {
                message: format!("stored seed for {}: {}", reference, e),
            })
        })
    }

    /// Point `order[reference]` at `tx_hash`, keyed for listing by the
    /// order's creation time.
    pub fn save_order_tx(
        &self,
        reference: &str,
        tx_hash: &str,
        created_at: i64,
    ) -> ProtocolResult<()> {
        let index = IndexMap::from([(TIME_INDEX.to_string(), format!("{:020}", created_at))]);
        self.store.set_string(ORDER, reference, tx_hash, &index)?;
        Ok(())
    }

    pub fn order_tx(&self, reference: &str) -> ProtocolResult<String> {
        Ok(self.store.get_string(ORDER, reference)?)
    }

    pub fn list_orders(&self, skip: usize, limit: usize, reverse: bool) -> ProtocolResult<Vec<String>> {
        Ok(self.store.list_keys(ORDER, TIME_INDEX, skip, limit, reverse)?)
    }

    pub fn save_part2(&self, reference: &str, order: &OrderDocument) -> ProtocolResult<()> {
        self.store
            .set(ORDER_PART2, reference, &order.encode_to_vec(), &IndexMap::new())?;
        Ok(())
    }

    pub fn part2(&self, reference: &str) -> ProtocolResult<OrderDocument> {
        let raw = self.store.get(ORDER_PART2, reference)?;
        OrderDocument::decode(raw.as_slice())
            .map_err(|e| ProtocolError::violation(format!("stored part 2: {}", e)))
    }

    /// Highest processor recorded for `reference`, `None` if never seen.
    pub fn state(&self, reference: &str) -> ProtocolResult<Processor> {
        match self.store.get_string(ORDER_STATE, reference) {
            Ok(s) => s
                .parse()
                .map_err(|e| ProtocolError::violation(format!("stored order state: {}", e))),
            Err(e) if e.is_not_found() => Ok(Processor::None),
            Err(e) => Err(e.into()),
        }
    }

    /// Raise the recorded state to `processor`; never lowers it.
    pub fn advance(&self, reference: &str, processor: Processor) -> ProtocolResult<()> {
        if processor.rank() > self.state(reference)?.rank() {
            self.store
                .set_string(ORDER_STATE, reference, processor.as_str(), &IndexMap::new())?;
        }
        Ok(())
    }

    /// Whether a transaction carrying `processor` would move `reference` forward.
    pub fn is_fresh(&self, reference: &str, processor: Processor) -> ProtocolResult<bool> {
        Ok(processor.rank() > self.state(reference)?.rank())
    }

    pub fn save_final_key(&self, key: &FinalKey) -> ProtocolResult<()> {
        self.store
            .set_json(FINAL_KEY, &key.order_reference, key, &IndexMap::new())?;
        Ok(())
    }

    pub fn final_key(&self, reference: &str) -> ProtocolResult<FinalKey> {
        Ok(self.store.get_json(FINAL_KEY, reference)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Disposition;

    fn book() -> OrderBook {
        OrderBook::new(LocalStore::in_memory())
    }

    #[test]
    fn test_state_only_moves_forward() {
        let book = book();
        assert_eq!(book.state("r").unwrap(), Processor::None);
        assert!(book.is_fresh("r", Processor::FulfillRequest).unwrap());

        book.advance("r", Processor::FulfillResponse).unwrap();
        book.advance("r", Processor::FulfillRequest).unwrap();
        assert_eq!(book.state("r").unwrap(), Processor::FulfillResponse);

        assert!(!book.is_fresh("r", Processor::FulfillResponse).unwrap());
        assert!(!book.is_fresh("r", Processor::FulfillRequest).unwrap());
        assert!(book.is_fresh("r", Processor::FulfillSecretRequest).unwrap());
    }

    #[test]
    fn test_missing_seed_is_fatal() {
        let err = book().seed("nope").unwrap_err();
        assert!(matches!(err, ProtocolError::MissingSeed { ref reference } if reference == "nope"));
        assert_eq!(err.disposition(), Disposition::Fatal);
    }

    #[test]
    fn test_orders_list_by_creation_time() {
        let book = book();
        book.save_order_tx("late", "aa", 1_700_000_200).unwrap();
        book.save_order_tx("early", "bb", 1_700_000_100).unwrap();
        // Re-pointing an order keeps its place.
        book.save_order_tx("early", "cc", 1_700_000_100).unwrap();

        assert_eq!(book.list_orders(0, 0, false).unwrap(), vec!["early", "late"]);
        assert_eq!(book.list_orders(0, 1, true).unwrap(), vec!["late"]);
        assert_eq!(book.order_tx("early").unwrap(), "cc");
    }

    #[test]
    fn test_part2_round_trip() {
        let book = book();
        let order = OrderDocument {
            reference: "r".into(),
            coin: 1,
            ..Default::default()
        };
        book.save_part2("r", &order).unwrap();
        assert_eq!(book.part2("r").unwrap(), order);
    }
}
