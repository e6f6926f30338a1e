//! # Service Plugins
//!
//! A plugin decides what the jointly created secret *means*: a bitcoin key,
//! a key that seals a stored plaintext, and so on. The protocol calls it at
//! four points:
//!
//! | Hook | Node | When |
//! |------|------|------|
//! | `validate_order_request` / `prepare_order_part1` | principal | building part 1 |
//! | `prepare_order_response` | principal | joint commitment known |
//! | `validate_order_secret_request` | principal | building part 3 |
//! | `produce_final_secret` | beneficiary | final key reconstructed |
//!
//! The order's `type` field names the plugin that created it, so the
//! receiving nodes interpret it the same way regardless of their own
//! configured default.

mod bitcoin;
mod safeguard;

use std::sync::Arc;

use dta_04_envelope::OrderDocument;

pub use bitcoin::BitcoinWallet;
pub use safeguard::SafeguardSecret;

use crate::api::Extension;
use crate::errors::{ProtocolError, ProtocolResult};

/// Vendor reported by the bundled plugins.
pub const MILAGRO_VENDOR: &str = "Milagro";

/// Name accepted as an alias of [`SafeguardSecret`].
pub const DEFAULT_PLUGIN_ALIAS: &str = "milagro";

pub trait ServicePlugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn vendor(&self) -> &'static str {
        MILAGRO_VENDOR
    }

    /// Check the extension supplied with a deposit request.
    fn validate_order_request(&self, extension: &Extension) -> ProtocolResult<()>;

    /// Fill plugin fields of a fresh order from the request extension.
    fn prepare_order_part1(
        &self,
        _order: &mut OrderDocument,
        _extension: &Extension,
    ) -> ProtocolResult<()> {
        Ok(())
    }

    /// Check the extension supplied with a redemption request.
    fn validate_order_secret_request(
        &self,
        _order: &OrderDocument,
        _extension: &Extension,
    ) -> ProtocolResult<()> {
        Ok(())
    }

    /// Extension stored in part 2 once the joint `commitment` is known.
    ///
    /// May strip request parameters from `order` that must not be kept.
    fn prepare_order_response(
        &self,
        order: &mut OrderDocument,
        commitment: &str,
    ) -> ProtocolResult<Extension>;

    /// Interpret the reconstructed secret (hex private key).
    fn produce_final_secret(
        &self,
        order: &OrderDocument,
        final_secret: &str,
        commitment: &str,
    ) -> ProtocolResult<Extension>;
}

/// Plugin registered under `name`.
pub fn plugin_by_name(name: &str) -> ProtocolResult<Arc<dyn ServicePlugin>> {
    match name {
        bitcoin::PLUGIN_NAME => Ok(Arc::new(BitcoinWallet)),
        safeguard::PLUGIN_NAME | DEFAULT_PLUGIN_ALIAS => Ok(Arc::new(SafeguardSecret)),
        other => Err(ProtocolError::validation(format!("unknown plugin '{}'", other))),
    }
}
