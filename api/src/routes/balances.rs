use std::sync::Arc;

use abi_codec::format_units;
use axum::{extract::State, routing::{get, post}, Json, Router};
use chrono::{DateTime, Utc};
use domain::{BalanceRecord, SyncSnapshot, SyncStatus};
use serde::Serialize;

use crate::{
    services::{Holder, MetadataCache},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/balances", get(current))
        .route("/balances/refresh", post(refresh))
        .route("/balances/pause", post(pause))
        .route("/balances/resume", post(resume))
}

#[derive(Debug, Serialize)]
pub struct BalanceView {
    #[serde(flatten)]
    pub record: BalanceRecord,
    pub formatted: String,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct SnapshotView {
    pub sequence: u64,
    pub status: SyncStatus,
    pub native: Option<BalanceView>,
    pub tokens: Vec<BalanceView>,
    pub updated_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub live_updates: bool,
    pub fetching: bool,
}

async fn view(snapshot: &SyncSnapshot, metadata: &MetadataCache, fetching: bool) -> SnapshotView {
    let native = snapshot.native.clone().map(|record| BalanceView {
        formatted: format_units(record.raw_amount, record.decimals),
        label: record.symbol.clone(),
        record,
    });
    let mut tokens = Vec::with_capacity(snapshot.tokens.len());
    for record in &snapshot.tokens {
        tokens.push(BalanceView {
            formatted: format_units(record.raw_amount, record.decimals),
            label: metadata.label(&record.address).await,
            record: record.clone(),
        });
    }
    SnapshotView {
        sequence: snapshot.sequence,
        status: snapshot.status,
        native,
        tokens,
        updated_at: snapshot.updated_at,
        error: snapshot.error.clone(),
        live_updates: snapshot.live_updates,
        fetching,
    }
}

pub(crate) async fn render(
    state: &AppState,
    holder: Holder,
    snapshot: Arc<SyncSnapshot>,
) -> Json<SnapshotView> {
    let fetching = state.engine.is_fetching_for(holder);
    Json(view(&snapshot, state.engine.metadata(), fetching).await)
}

async fn current(State(state): State<AppState>) -> Json<SnapshotView> {
    let snapshot = state.engine.snapshot();
    render(&state, Holder::Vault, snapshot).await
}

async fn refresh(State(state): State<AppState>) -> Json<SnapshotView> {
    let snapshot = state.engine.refresh().await;
    render(&state, Holder::Vault, snapshot).await
}

async fn pause(State(state): State<AppState>) -> Json<SnapshotView> {
    state.engine.pause();
    render(&state, Holder::Vault, state.engine.snapshot()).await
}

async fn resume(State(state): State<AppState>) -> Json<SnapshotView> {
    state.engine.resume();
    render(&state, Holder::Vault, state.engine.snapshot()).await
}
