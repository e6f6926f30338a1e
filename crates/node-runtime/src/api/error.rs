//! Mapping of service failures onto HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dta_02_content_store::ContentStoreError;
use dta_03_chain_client::ChainError;
use dta_05_identity::IdentityError;
use dta_06_order_protocol::ProtocolError;
use serde_json::json;

/// Error body: `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), error = %self.message, "request failed");
        } else {
            tracing::debug!(status = self.status.as_u16(), error = %self.message, "request refused");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<ProtocolError> for ApiError {
    fn from(e: ProtocolError) -> Self {
        let status = match &e {
            e if e.is_invalid_request() => StatusCode::UNPROCESSABLE_ENTITY,
            // Node-type gating and out-of-order redemptions land here.
            ProtocolError::ProtocolViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            e if e.is_not_found() => StatusCode::NOT_FOUND,
            ProtocolError::Identity(IdentityError::ContentStore(ContentStoreError::NotFound(_))) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ProtocolError::Chain(ChainError::Transport { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<IdentityError> for ApiError {
    fn from(e: IdentityError) -> Self {
        let status = match &e {
            IdentityError::ContentStore(ContentStoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            IdentityError::ContentStore(ContentStoreError::InvalidCid(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            IdentityError::ContentStore(ContentStoreError::Connection { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}
