//! Dispatch ledger: how far this node has read the chain.
//!
//! The cursor lives at `chain/height` as `"<height>.<index>"`; each handled
//! transaction also leaves a `processed/<txid>` marker holding its position.

use dta_01_local_store::{IndexMap, LocalStore, LocalStoreError};
use shared_types::ChainPosition;

const CHAIN: &str = "chain";
const HEIGHT: &str = "height";
const PROCESSED: &str = "processed";

#[derive(Clone)]
pub struct DispatchLedger {
    store: LocalStore,
}

impl DispatchLedger {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Last handled position; the origin if nothing was handled yet.
    pub fn cursor(&self) -> Result<ChainPosition, LocalStoreError> {
        match self.store.get_string(CHAIN, HEIGHT) {
            Ok(raw) => raw.parse().map_err(|e| LocalStoreError::Codec {
                message: format!("bad chain cursor {:?}: {}", raw, e),
            }),
            Err(e) if e.is_not_found() => Ok(ChainPosition::default()),
            Err(e) => Err(e),
        }
    }

    /// Move the cursor to `position`. Never moves it backwards.
    pub fn advance(&self, position: ChainPosition) -> Result<(), LocalStoreError> {
        if position <= self.cursor()? {
            return Ok(());
        }
        self.store
            .set_string(CHAIN, HEIGHT, &position.to_string(), &IndexMap::new())
    }

    pub fn is_processed(&self, tx_hash: &str) -> Result<bool, LocalStoreError> {
        match self.store.get(PROCESSED, tx_hash) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn mark_processed(
        &self,
        tx_hash: &str,
        position: ChainPosition,
    ) -> Result<(), LocalStoreError> {
        self.store
            .set_string(PROCESSED, tx_hash, &position.to_string(), &IndexMap::new())
    }
}
