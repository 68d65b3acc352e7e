use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use domain::{
    Address, DepositRequest, TxHashResponse, WithdrawNativeRequest, WithdrawTokenRequest,
};
use serde::Serialize;

use crate::{
    routes::{operation_error, session::spawn_refresh, ApiResult},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/vault/owner", get(owner))
        .route("/vault/deposit", post(deposit))
        .route("/vault/withdraw-native", post(withdraw_native))
        .route("/vault/withdraw-token", post(withdraw_token))
}

#[derive(Debug, Serialize)]
struct OwnerResponse {
    vault: Address,
    owner: Address,
}

async fn owner(State(state): State<AppState>) -> ApiResult<Json<OwnerResponse>> {
    let owner = state.operations.owner().await.map_err(operation_error)?;
    Ok(Json(OwnerResponse {
        vault: state.config.vault_address,
        owner,
    }))
}

async fn deposit(
    State(state): State<AppState>,
    Json(payload): Json<DepositRequest>,
) -> ApiResult<Json<TxHashResponse>> {
    let tx_hash = state
        .operations
        .deposit_token(&payload.token, &payload.amount)
        .await
        .map_err(operation_error)?;
    spawn_refresh(&state);
    Ok(Json(TxHashResponse { tx_hash }))
}

async fn withdraw_native(
    State(state): State<AppState>,
    Json(payload): Json<WithdrawNativeRequest>,
) -> ApiResult<Json<TxHashResponse>> {
    let tx_hash = state
        .operations
        .withdraw_native(&payload.recipient, &payload.amount)
        .await
        .map_err(operation_error)?;
    spawn_refresh(&state);
    Ok(Json(TxHashResponse { tx_hash }))
}

async fn withdraw_token(
    State(state): State<AppState>,
    Json(payload): Json<WithdrawTokenRequest>,
) -> ApiResult<Json<TxHashResponse>> {
    let tx_hash = state
        .operations
        .withdraw_token(&payload.token, &payload.recipient, &payload.amount)
        .await
        .map_err(operation_error)?;
    spawn_refresh(&state);
    Ok(Json(TxHashResponse { tx_hash }))
}
