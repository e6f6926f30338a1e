//! Request and response bodies for the operations callers can start.
//!
//! Field names are camelCase on the wire to match the admin HTTP API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type Extension = BTreeMap<String, String>;

/// Start a deposit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(default, rename = "beneficiaryIDDocumentCID", skip_serializing_if = "Option::is_none")]
    pub beneficiary_id_document_cid: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extension: Extension,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_reference: String,
    /// Chain hash of the transaction just posted.
    pub tx_hash: String,
    pub created_at: i64,
}

/// Start a redemption.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSecretRequest {
    pub order_reference: String,
    #[serde(default, rename = "beneficiaryIDDocumentCID", skip_serializing_if = "Option::is_none")]
    pub beneficiary_id_document_cid: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extension: Extension,
}

/// An order as this node last saw it on chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub order_reference: String,
    pub tx_hash: String,
    /// Processor of the latest part this node handled.
    pub state: String,
    pub principal_cid: String,
    pub beneficiary_cid: String,
    pub beneficiary_type: String,
    pub plugin: String,
    pub coin: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment: Option<String>,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extension: Extension,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListResponse {
    pub order_reference: Vec<String>,
}

/// What the beneficiary reconstructed at the end of a redemption.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalKey {
    pub order_reference: String,
    /// Compressed SEC1 public key of the reconstructed secret.
    pub commitment: String,
    #[serde(default)]
    pub extension: Extension,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_request_wire_names() {
        let req: OrderRequest = serde_json::from_str(
            r#"{"beneficiaryIDDocumentCID":"QmX","extension":{"coin":"0"}}"#,
        )
        .unwrap();
        assert_eq!(req.beneficiary_id_document_cid.as_deref(), Some("QmX"));
        assert_eq!(req.extension["coin"], "0");

        let empty: OrderRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, OrderRequest::default());
    }

    #[test]
    fn test_secret_request_wire_names() {
        let req = OrderSecretRequest {
            order_reference: "r".into(),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"orderReference":"r"}"#
        );
    }
}
