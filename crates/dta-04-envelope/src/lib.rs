//! # Envelope Codec (dta-04)
//!
//! Every document a D-TA node publishes or posts travels in a signed envelope:
//!
//! ```text
//! SignedEnvelope
//! ├── signer_cid            who signed (IDDoc CID, empty for IDDocs)
//! ├── signature             BLS over `message`
//! └── message = Envelope
//!     ├── header            version, type codes, IVs, wrapped keys
//!     ├── body              plaintext document
//!     └── encrypted_body    AES-256-CBC secret document
//! ```
//!
//! The secret body is readable by every CID listed in `header.recipients`;
//! each entry holds the AES key wrapped through the KEM for that reader.
//!
//! ## Modules
//!
//! - `proto` - wire messages
//! - `body` - the document registry and the [`Body`] variant
//! - `codec` - [`encode`] / [`decode`]
//! - `documents` - typed helpers for IDDocs, orders and sealed strings
//! - `validate` - field rules run after every decode

pub mod body;
pub mod codec;
pub mod documents;
pub mod errors;
pub mod proto;
pub mod validate;

pub use body::{Body, DocKind};
pub use codec::{
    decode, encode, envelope_cid, peek_signer, verify, Decoded, ReaderKeys, Recipients,
    ENVELOPE_VERSION, SECRET_PAD_BLOCK,
};
pub use documents::{
    decode_iddoc, decode_order, decode_secret_string, encode_iddoc, encode_order,
    encode_secret_string,
};
pub use errors::EnvelopeError;
pub use proto::{
    BeneficiaryType, Header, IdDocument, OrderDocument, OrderPart2, OrderPart3, OrderPart4,
    Policy, Recipient, SignedEnvelope, SimpleString,
};
