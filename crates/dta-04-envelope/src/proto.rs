//! Protobuf messages for the envelope and the documents it carries.
//!
//! ```text
//! SignedEnvelope { signature=1, signer_cid=2, message=3 }
//!   message = Envelope { header=1, body=2, encrypted_body=3 }
//!     header  = Header { ..., recipients=10 }
//!     body    = serialized plaintext document
//!     encrypted_body = AES-CBC(serialized secret document)
//! ```
//!
//! Field numbers are the wire contract; never renumber.

use std::collections::BTreeMap;

use prost::Message;

#[derive(Clone, PartialEq, Message)]
pub struct SignedEnvelope {
    #[prost(bytes = "vec", tag = "1")]
    pub signature: Vec<u8>,
    #[prost(string, tag = "2")]
    pub signer_cid: String,
    #[prost(bytes = "vec", tag = "3")]
    pub message: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Envelope {
    #[prost(message, optional, tag = "1")]
    pub header: Option<Header>,
    #[prost(bytes = "vec", tag = "2")]
    pub body: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub encrypted_body: Vec<u8>,
}

/// Envelope header. Everything here is plaintext.
#[derive(Clone, PartialEq, Message)]
pub struct Header {
    /// Where the envelope was fetched from; set on decode, never signed.
    #[prost(string, tag = "1")]
    pub ipfs_id: String,
    #[prost(float, tag = "2")]
    pub version: f32,
    #[prost(int64, tag = "3")]
    pub datetime: i64,
    #[prost(string, tag = "4")]
    pub previous_cid: String,
    #[prost(float, tag = "5")]
    pub body_type_code: f32,
    #[prost(float, tag = "6")]
    pub body_version: f32,
    #[prost(float, tag = "7")]
    pub encrypted_body_type_code: f32,
    #[prost(float, tag = "8")]
    pub encrypted_body_version: f32,
    #[prost(bytes = "vec", tag = "9")]
    pub encrypted_body_iv: Vec<u8>,
    #[prost(message, repeated, tag = "10")]
    pub recipients: Vec<Recipient>,
}

/// The envelope's AES key wrapped for one reader.
#[derive(Clone, PartialEq, Message)]
pub struct Recipient {
    #[prost(float, tag = "1")]
    pub version: f32,
    #[prost(string, tag = "2")]
    pub cid: String,
    #[prost(bytes = "vec", tag = "3")]
    pub encapsulated_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub ciphertext: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub iv: Vec<u8>,
}

/// A node's published identity.
#[derive(Clone, PartialEq, Message)]
pub struct IdDocument {
    #[prost(string, tag = "1")]
    pub authentication_reference: String,
    /// Compressed SECP256K1 point, 33 bytes.
    #[prost(bytes = "vec", tag = "2")]
    pub beneficiary_ec_public_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub sike_public_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub bls_public_key: Vec<u8>,
    #[prost(int64, tag = "5")]
    pub timestamp: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum BeneficiaryType {
    Unspecified = 0,
    KnownAtStart = 1,
    UnknownAtStart = 2,
}

#[derive(Clone, PartialEq, Message)]
pub struct OrderDocument {
    /// Plugin that interprets the final secret.
    #[prost(string, tag = "1")]
    pub r#type: String,
    #[prost(int64, tag = "2")]
    pub coin: i64,
    #[prost(string, tag = "3")]
    pub principal_cid: String,
    #[prost(string, tag = "4")]
    pub beneficiary_cid: String,
    #[prost(string, tag = "5")]
    pub reference: String,
    #[prost(int64, tag = "6")]
    pub timestamp: i64,
    #[prost(message, optional, tag = "7")]
    pub order_part2: Option<OrderPart2>,
    #[prost(message, optional, tag = "8")]
    pub order_part3: Option<OrderPart3>,
    #[prost(message, optional, tag = "9")]
    pub order_part4: Option<OrderPart4>,
    #[prost(enumeration = "BeneficiaryType", tag = "10")]
    pub beneficiary_type: i32,
    #[prost(btree_map = "string, string", tag = "11")]
    pub order_req_extension: BTreeMap<String, String>,
    #[prost(btree_map = "string, string", tag = "12")]
    pub order_secret_req_extension: BTreeMap<String, String>,
}

/// Fiduciary's reply: the joint commitment.
#[derive(Clone, PartialEq, Message)]
pub struct OrderPart2 {
    #[prost(string, tag = "1")]
    pub commitment_public_key: String,
    #[prost(string, tag = "2")]
    pub previous_order_cid: String,
    #[prost(btree_map = "string, string", tag = "3")]
    pub extension: BTreeMap<String, String>,
    #[prost(int64, tag = "4")]
    pub timestamp: i64,
}

/// Principal's redemption request.
#[derive(Clone, PartialEq, Message)]
pub struct OrderPart3 {
    #[prost(string, tag = "1")]
    pub redemption: String,
    #[prost(string, tag = "2")]
    pub previous_order_cid: String,
    /// Envelope carrying the principal's share for an unknown-at-start beneficiary.
    #[prost(bytes = "vec", tag = "3")]
    pub beneficiary_encrypted_data: Vec<u8>,
    #[prost(btree_map = "string, string", tag = "4")]
    pub extension: BTreeMap<String, String>,
    #[prost(int64, tag = "5")]
    pub timestamp: i64,
}

/// Fiduciary's release of its share.
#[derive(Clone, PartialEq, Message)]
pub struct OrderPart4 {
    #[prost(string, tag = "1")]
    pub secret: String,
    #[prost(string, tag = "2")]
    pub previous_order_cid: String,
    #[prost(btree_map = "string, string", tag = "3")]
    pub extension: BTreeMap<String, String>,
    #[prost(int64, tag = "4")]
    pub timestamp: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct SimpleString {
    #[prost(string, tag = "1")]
    pub content: String,
}

/// Federation policy. Carried by the registry; no protocol step reads it.
#[derive(Clone, PartialEq, Message)]
pub struct Policy {
    #[prost(float, tag = "1")]
    pub version: f32,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(int64, tag = "3")]
    pub participant_count: i64,
    #[prost(int64, tag = "4")]
    pub threshold: i64,
}

impl OrderDocument {
    /// `beneficiary_type` as the enum, `Unspecified` for unknown values.
    pub fn beneficiary_kind(&self) -> BeneficiaryType {
        BeneficiaryType::try_from(self.beneficiary_type).unwrap_or(BeneficiaryType::Unspecified)
    }
}
