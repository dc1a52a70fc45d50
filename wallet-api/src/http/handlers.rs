//! Request handlers

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;
use wallet_core::{OperationRequest, Wallet};

use super::error::ApiError;
use super::AppState;

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Create a wallet with balance 0 and version 1
pub async fn create_wallet(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Wallet>), ApiError> {
    let ctx = state.call_context();
    let wallet = state.wallets().create(&ctx).await?;
    Ok((StatusCode::CREATED, Json(wallet)))
}

pub async fn get_wallet(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Wallet>, ApiError> {
    let Path(id) = id?;
    let ctx = state.call_context();
    let wallet = state.wallets().get(id, &ctx).await?;
    Ok(Json(wallet))
}

/// Apply a deposit or withdrawal and return the committed wallet
pub async fn submit_operation(
    State(state): State<AppState>,
    payload: Result<Json<OperationRequest>, JsonRejection>,
) -> Result<Json<Wallet>, ApiError> {
    let Json(request) = payload?;
    let ctx = state.call_context();
    let wallet = state.wallets().submit(&request, &ctx).await?;
    Ok(Json(wallet))
}
