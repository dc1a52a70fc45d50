//! HTTP surface
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | POST | `/api/v1/wallets` | Create a wallet |
//! | GET | `/api/v1/wallets/:id` | Fetch a wallet |
//! | POST | `/api/v1/wallet` | Deposit or withdraw |
//! | GET | `/api/health` | Liveness |

pub mod error;
mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use wallet_core::services::WalletService;
use wallet_core::{CallContext, WalletContext};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    context: Arc<WalletContext>,
    request_timeout: Duration,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(context: Arc<WalletContext>, shutdown: CancellationToken) -> Self {
        let request_timeout = context.config.server.request_timeout;
        Self {
            context,
            request_timeout,
            shutdown,
        }
    }

    fn wallets(&self) -> &WalletService {
        &self.context.wallet_service
    }

    /// Per-request context: the request deadline plus a child of the
    /// server's shutdown token
    fn call_context(&self) -> CallContext {
        CallContext::new()
            .with_cancel(self.shutdown.child_token())
            .with_timeout(self.request_timeout)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/v1/wallets", post(handlers::create_wallet))
        .route("/api/v1/wallets/:id", get(handlers::get_wallet))
        .route("/api/v1/wallet", post(handlers::submit_operation))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;
    use wallet_core::config::Config;
    use wallet_core::services::EntryPoint;

    fn test_state() -> AppState {
        let context = WalletContext::new(Config::default(), EntryPoint::Api).unwrap();
        AppState::new(Arc::new(context), CancellationToken::new())
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn create(app: &Router) -> Value {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/wallets")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(router(test_state()), get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let app = router(test_state());
        let created = create(&app).await;
        assert_eq!(created["balance"], 0);
        assert_eq!(created["version"], 1);

        let id = created["id"].as_str().unwrap();
        let (status, fetched) = send(app, get(&format!("/api/v1/wallets/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_operation_flow_and_insufficient_funds() {
        let app = router(test_state());
        let id = create(&app).await["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            app.clone(),
            post_json("/api/v1/wallet", json!({ "walletId": id, "operationType": "DEPOSIT", "amount": 100 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balance"], 100);
        assert_eq!(body["version"], 2);

        let (status, body) = send(
            app.clone(),
            post_json("/api/v1/wallet", json!({ "walletId": id, "operationType": "WITHDRAW", "amount": 150 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INSUFFICIENT_FUNDS");

        let (_, body) = send(app, get(&format!("/api/v1/wallets/{id}"))).await;
        assert_eq!(body["balance"], 100);
        assert_eq!(body["version"], 2);
    }

    #[tokio::test]
    async fn test_invalid_operations_are_rejected() {
        let app = router(test_state());
        let id = create(&app).await["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            app.clone(),
            post_json("/api/v1/wallet", json!({ "walletId": id, "operationType": "DEPOSIT", "amount": -5 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_AMOUNT");

        let (status, body) = send(
            app.clone(),
            post_json("/api/v1/wallet", json!({ "walletId": id, "operationType": "deposit", "amount": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_OPERATION_TYPE");

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/wallet")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids() {
        let app = router(test_state());

        let missing = Uuid::new_v4();
        let (status, body) = send(app.clone(), get(&format!("/api/v1/wallets/{missing}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "WALLET_NOT_FOUND");

        let (status, body) = send(app.clone(), get("/api/v1/wallets/not-a-uuid")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_REQUEST");

        let (status, body) = send(
            app,
            post_json("/api/v1/wallet", json!({ "walletId": missing, "operationType": "DEPOSIT", "amount": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "WALLET_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_shutdown_cancels_requests() {
        let state = test_state();
        let app = router(state.clone());
        let id = create(&app).await["id"].as_str().unwrap().to_string();

        state.shutdown.cancel();
        let (status, body) = send(
            app,
            post_json("/api/v1/wallet", json!({ "walletId": id, "operationType": "DEPOSIT", "amount": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "CANCELLED");
        assert_eq!(body["error"], "request cancelled");
    }
}
