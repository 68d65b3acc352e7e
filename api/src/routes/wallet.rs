use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::{
    routes::balances::{render, SnapshotView},
    services::Holder,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/wallet/balances", get(current))
        .route("/wallet/balances/refresh", post(refresh))
}

async fn current(State(state): State<AppState>) -> Json<SnapshotView> {
    let snapshot = state.engine.snapshot_of(Holder::Wallet);
    render(&state, Holder::Wallet, snapshot).await
}

async fn refresh(State(state): State<AppState>) -> Json<SnapshotView> {
    let snapshot = state.engine.refresh_for(Holder::Wallet).await;
    render(&state, Holder::Wallet, snapshot).await
}
