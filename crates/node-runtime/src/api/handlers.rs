//! Admin endpoint handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dta_05_identity::retrieve_iddoc;
use dta_06_order_protocol::{
    OrderApi, OrderListResponse, OrderRequest, OrderResponse, OrderSecretRequest, OrderView,
};

use super::error::ApiError;
use super::{AppState, API_VERSION, APPLICATION};

/// `GET /v1/order` query.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderListQuery {
    /// Zero-based page.
    pub page: usize,
    /// Page size; `0` lists everything.
    pub per_page: usize,
    /// `dateCreatedAsc` for oldest first; newest first otherwise.
    pub sort_by: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityView {
    #[serde(rename = "idDocumentCID")]
    pub id_document_cid: String,
    pub authentication_reference: String,
    #[serde(rename = "beneficiaryECPublicKey")]
    pub beneficiary_ec_public_key: String,
    pub sike_public_key: String,
    #[serde(rename = "blsPublicKey")]
    pub bls_public_key: String,
    pub timestamp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub application: String,
    pub time_stamp: DateTime<Utc>,
    pub api_version: String,
    #[serde(rename = "nodeCID")]
    pub node_cid: String,
    pub extension_vendor: String,
    pub plugin: String,
    pub node_type: String,
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<OrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    Ok(Json(state.orders.start_deposit(request).await?))
}

pub async fn redeem_order(
    State(state): State<AppState>,
    Json(request): Json<OrderSecretRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    if request.order_reference.trim().is_empty() {
        return Err(ApiError::invalid("orderReference is required"));
    }
    Ok(Json(state.orders.start_redemption(request).await?))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(state.orders.get_order(&reference).await?))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let skip = query.page.saturating_mul(query.per_page);
    let newest_first = query.sort_by != "dateCreatedAsc";
    let order_reference = OrderApi::list_orders(
        state.orders.as_ref(),
        skip,
        query.per_page,
        newest_first,
    )
    .await?;
    Ok(Json(OrderListResponse { order_reference }))
}

pub async fn get_identity(
    State(state): State<AppState>,
    Path(cid): Path<String>,
) -> Result<Json<IdentityView>, ApiError> {
    let iddoc = retrieve_iddoc(state.content.as_ref(), &cid).await?;
    Ok(Json(IdentityView {
        id_document_cid: cid,
        authentication_reference: iddoc.authentication_reference,
        beneficiary_ec_public_key: hex::encode(iddoc.beneficiary_ec_public_key),
        sike_public_key: hex::encode(iddoc.sike_public_key),
        bls_public_key: hex::encode(iddoc.bls_public_key),
        timestamp: iddoc.timestamp,
    }))
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let node = state.orders.node();
    let plugin = state.orders.plugin();
    Json(StatusResponse {
        application: APPLICATION.to_string(),
        time_stamp: Utc::now(),
        api_version: API_VERSION.to_string(),
        node_cid: node.cid.clone(),
        extension_vendor: plugin.vendor().to_string(),
        plugin: plugin.name().to_string(),
        node_type: node.node_type.as_str().to_string(),
    })
}
