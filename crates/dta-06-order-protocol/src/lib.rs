//! # Order Protocol (dta-06)
//!
//! The four-message deposit/redemption protocol that splits a SECP256K1 key
//! into two additive shares, one held by the principal side and one by the
//! fiduciary, and later hands both to a beneficiary.
//!
//! ## State Machine
//!
//! ```text
//! [None] --start_deposit--> FULFILL_REQUEST --on_request--> FULFILL_RESPONSE
//!        --start_redemption--> FULFILL_SECRET_REQUEST --on_secret_request-->
//!        FULFILL_SECRET_RESPONSE (terminal)
//! ```
//!
//! Each node records the highest processor it has seen per reference; a
//! transaction that would not move that forward is ignored.
//!
//! ## Shares
//!
//! | Share | Holder | Secret | Public |
//! |-------|--------|--------|--------|
//! | fiduciary | fiduciary | `redeem_secret(seed)` | `redeem_public_key(seed)` in part 2 |
//! | principal, known beneficiary | beneficiary | identity EC key | IDDoc `beneficiary_ec_public_key` |
//! | principal, unknown beneficiary | principal | `redeem_secret(SHA-256(seed ‖ part1 tx))` | derived alike |
//!
//! The joint commitment is the sum of both public shares; the beneficiary
//! checks the sum of both secrets against it.
//!
//! ## Crate Structure
//!
//! - `api` - request/response bodies
//! - `errors` - [`ProtocolError`] and its dispatcher [`Disposition`]
//! - `plugins/` - [`ServicePlugin`], `bitcoinwallet`, `safeguardsecret`
//! - `ports/` - [`OrderApi`] and [`ChainEvents`]
//! - `service/` - [`OrderService`], one file per role
//! - `state` - [`OrderBook`], the per-reference local records

pub mod api;
pub mod errors;
pub mod plugins;
pub mod ports;
pub mod service;
pub mod state;

pub use api::{
    Extension, FinalKey, OrderListResponse, OrderRequest, OrderResponse, OrderSecretRequest,
    OrderView,
};
pub use errors::{Disposition, ProtocolError, ProtocolResult};
pub use plugins::{plugin_by_name, BitcoinWallet, SafeguardSecret, ServicePlugin};
pub use ports::{ChainEvents, OrderApi, Outcome};
pub use service::{NodeIdentity, OrderService, ProtocolDependencies, SHARE_SEED_LEN};
pub use state::OrderBook;
