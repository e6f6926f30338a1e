//! # Admin HTTP API
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST | `/v1/order` | start a deposit |
//! | POST | `/v1/order/secret` | start a redemption |
//! | GET | `/v1/order/{reference}` | order as last seen on chain |
//! | GET | `/v1/order?page&perPage&sortBy` | order references |
//! | GET | `/v1/identity/{cid}` | a published IDDoc |
//! | GET | `/v1/status` | node status |
//!
//! Failures map to 422 (bad request), 404 (unknown reference), 503 (chain
//! unreachable) or 500.

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use dta_02_content_store::ContentStore;
use dta_06_order_protocol::OrderService;

pub use error::ApiError;

pub const API_VERSION: &str = "v1";
pub const APPLICATION: &str = "Milagro Distributed Trust";

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub content: Arc<dyn ContentStore>,
}

/// CORS from `http.corsAllow`: `*` or comma separated origins.
pub fn cors_layer(allow: &str) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allow.trim() == "*" || allow.trim().is_empty() {
        return cors.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = allow
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();
    cors.allow_origin(origins)
}

pub fn router(state: AppState, cors_allow: &str) -> Router {
    Router::new()
        .route(
            "/v1/order",
            post(handlers::create_order).get(handlers::list_orders),
        )
        .route("/v1/order/secret", post(handlers::redeem_order))
        .route("/v1/order/:reference", get(handlers::get_order))
        .route("/v1/identity/:cid", get(handlers::get_identity))
        .route("/v1/status", get(handlers::status))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_allow))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use dta_01_local_store::LocalStore;
    use dta_02_content_store::MemoryContentStore;
    use dta_03_chain_client::MemoryChain;
    use dta_05_identity::{create_identity, Keyring};
    use dta_06_order_protocol::{plugin_by_name, NodeIdentity, ProtocolDependencies};
    use serde_json::Value;
    use shared_types::NodeType;
    use tower::ServiceExt;

    async fn app() -> (Router, String) {
        let content = Arc::new(MemoryContentStore::new());
        let (cid, keyring): (String, Keyring) = create_identity("alice", content.as_ref()).await.unwrap();
        let orders = Arc::new(OrderService::new(
            NodeIdentity {
                cid: cid.clone(),
                name: "alice".into(),
                node_type: NodeType::Principal,
                master_fiduciary_cid: cid.clone(),
            },
            ProtocolDependencies {
                keyring: Arc::new(keyring),
                store: LocalStore::in_memory(),
                content: content.clone(),
                chain: Arc::new(MemoryChain::new()),
                plugin: plugin_by_name("bitcoinwallet").unwrap(),
            },
        ));
        (router(AppState { orders, content }, "*"), cid)
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_status() {
        let (app, cid) = app().await;
        let (status, body) = call(app, get("/v1/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["nodeCID"], cid);
        assert_eq!(body["plugin"], "bitcoinwallet");
        assert_eq!(body["nodeType"], "principal");
        assert_eq!(body["apiVersion"], "v1");
    }

    #[tokio::test]
    async fn test_identity_lookup() {
        let (app, cid) = app().await;
        let (status, body) = call(app.clone(), get(&format!("/v1/identity/{}", cid))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["authenticationReference"], "alice");
        assert_eq!(body["idDocumentCID"], cid);

        let missing = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
        let (status, _) = call(app, get(&format!("/v1/identity/{}", missing))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_order_is_404() {
        let (app, _) = app().await;
        let (status, body) = call(app, get("/v1/order/no-such-reference")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("no-such-reference"));
    }

    #[tokio::test]
    async fn test_deposit_refused_with_422() {
        let (app, _) = app().await;
        // This node is its own master fiduciary, so it cannot originate.
        let (status, _) = call(
            app.clone(),
            post_json("/v1/order", serde_json::json!({ "extension": { "coin": "0" } })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(
            app,
            post_json("/v1/order/secret", serde_json::json!({ "orderReference": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_empty_order_list() {
        let (app, _) = app().await;
        let (status, body) = call(app, get("/v1/order?page=0&perPage=10")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["orderReference"], serde_json::json!([]));
    }
}
