//! # Core Domain Entities
//!
//! The on-chain transaction and the closed vocabularies that route it.
//!
//! ## Wire Shape
//!
//! `BlockChainTX` travels as a JSON object. `payload` is the raw envelope
//! internally and base64 on the wire; `tx_hash` is the lowercase hex of
//! `SHA-256(payload)`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::ParseError;

/// Tag naming the transaction's addressee; the subscription filter key.
pub const TAG_RECIPIENT: &str = "recipient";
/// Tag naming the transaction's author.
pub const TAG_SENDER: &str = "sender_id";
/// Tag carrying the order reference.
pub const TAG_REFERENCE: &str = "reference";
/// Tag carrying the hex transaction hash, used for lookups.
pub const TAG_TX_HASH: &str = "txhash";

// =============================================================================
// PROCESSOR
// =============================================================================

/// Routing label naming the handler that must consume a transaction.
///
/// The variant order is the protocol order; `rank` exposes it so that a
/// stale transition for a reference can be detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Processor {
    /// Informational transaction, logged only.
    None,
    /// Principal → Fiduciary: part 1 of a deposit.
    FulfillRequest,
    /// Fiduciary → Principal: part 2 carrying the commitment.
    FulfillResponse,
    /// Principal → Fiduciary: part 3 requesting redemption.
    FulfillSecretRequest,
    /// Fiduciary → Beneficiary: part 4 carrying the second share.
    FulfillSecretResponse,
}

impl Processor {
    /// Every processor tag, in protocol order.
    pub const ALL: [Processor; 5] = [
        Processor::None,
        Processor::FulfillRequest,
        Processor::FulfillResponse,
        Processor::FulfillSecretRequest,
        Processor::FulfillSecretResponse,
    ];

    /// Wire string for this tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Processor::None => "none",
            Processor::FulfillRequest => "fulfill_request",
            Processor::FulfillResponse => "fulfill_response",
            Processor::FulfillSecretRequest => "fulfill_secret_request",
            Processor::FulfillSecretResponse => "fulfill_secret_response",
        }
    }

    /// Position in the four-step protocol (0 for `None`).
    pub fn rank(&self) -> u8 {
        match self {
            Processor::None => 0,
            Processor::FulfillRequest => 1,
            Processor::FulfillResponse => 2,
            Processor::FulfillSecretRequest => 3,
            Processor::FulfillSecretResponse => 4,
        }
    }

    /// The processor of the part this one answers, if any.
    pub fn predecessor(&self) -> Option<Processor> {
        match self {
            Processor::None | Processor::FulfillRequest => None,
            Processor::FulfillResponse => Some(Processor::FulfillRequest),
            Processor::FulfillSecretRequest => Some(Processor::FulfillResponse),
            Processor::FulfillSecretResponse => Some(Processor::FulfillSecretRequest),
        }
    }
}

impl fmt::Display for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Processor {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Processor::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ParseError::UnknownProcessor(s.to_string()))
    }
}

// =============================================================================
// NODE TYPE
// =============================================================================

/// Roles a node is configured to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Principal and fiduciary endpoints both exposed.
    #[default]
    Multi,
    /// Originates deposits only.
    Principal,
    /// Answers deposits only.
    Fiduciary,
    /// Fiduciary trusted by the federation as default counterparty.
    MasterFiduciary,
}

impl NodeType {
    /// Whether a node of this type may originate deposits.
    pub fn can_originate(&self) -> bool {
        matches!(self, NodeType::Multi | NodeType::Principal)
    }

    /// Wire string for this node type.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Multi => "multi",
            NodeType::Principal => "principal",
            NodeType::Fiduciary => "fiduciary",
            NodeType::MasterFiduciary => "masterfiduciary",
        }
    }
}

impl FromStr for NodeType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multi" => Ok(NodeType::Multi),
            "principal" => Ok(NodeType::Principal),
            "fiduciary" => Ok(NodeType::Fiduciary),
            "masterfiduciary" => Ok(NodeType::MasterFiduciary),
            other => Err(ParseError::UnknownNodeType(other.to_string())),
        }
    }
}

// =============================================================================
// BLOCKCHAIN TX
// =============================================================================

/// A transaction on the append-only chain log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockChainTX {
    /// Handler the recipient must run.
    pub processor: Processor,
    /// CID of the author.
    pub sender_id: String,
    /// CID of the addressee.
    pub recipient_id: String,
    /// Further CIDs that may read the payload.
    #[serde(default)]
    pub additional_recipient_ids: Vec<String>,
    /// Encoded envelope.
    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,
    /// Hex SHA-256 of `payload`.
    pub tx_hash: String,
    /// Searchable tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Block height assigned by the chain; zero before commit.
    #[serde(default)]
    pub height: u64,
    /// Position within the block; zero before commit.
    #[serde(default)]
    pub index: u32,
}

impl BlockChainTX {
    /// Build an uncommitted transaction and fill in hash and standard tags.
    pub fn new(
        processor: Processor,
        sender_id: impl Into<String>,
        recipient_id: impl Into<String>,
        reference: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        let sender_id = sender_id.into();
        let recipient_id = recipient_id.into();
        let tx_hash = payload_hash_hex(&payload);

        let mut tags = BTreeMap::new();
        tags.insert(TAG_RECIPIENT.to_string(), recipient_id.clone());
        tags.insert(TAG_SENDER.to_string(), sender_id.clone());
        tags.insert(TAG_REFERENCE.to_string(), reference.into());
        tags.insert(TAG_TX_HASH.to_string(), tx_hash.clone());

        Self {
            processor,
            sender_id,
            recipient_id,
            additional_recipient_ids: Vec::new(),
            payload,
            tx_hash,
            tags,
            height: 0,
            index: 0,
        }
    }

    /// The `reference` tag, empty if absent.
    pub fn reference(&self) -> &str {
        self.tags.get(TAG_REFERENCE).map(String::as_str).unwrap_or("")
    }

    /// Whether `tx_hash` matches the payload.
    pub fn hash_matches_payload(&self) -> bool {
        payload_hash_hex(&self.payload) == self.tx_hash
    }

    /// Chain position as the `"<height>.<index>"` cursor string.
    pub fn position(&self) -> ChainPosition {
        ChainPosition {
            height: self.height,
            index: self.index,
        }
    }
}

/// Hex SHA-256 of a transaction payload.
pub fn payload_hash_hex(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Ordered position of a committed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct ChainPosition {
    /// Block height.
    pub height: u64,
    /// Index within the block.
    pub index: u32,
}

impl fmt::Display for ChainPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.height, self.index)
    }
}

impl FromStr for ChainPosition {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (height, index) = s.split_once('.').unwrap_or((s, "0"));
        Ok(Self {
            height: height.parse()?,
            index: index.parse()?,
        })
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
