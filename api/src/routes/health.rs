use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.engine.snapshot();
    Json(json!({
        "status": "ok",
        "sequence": snapshot.sequence,
        "live_updates": state.engine.is_live(),
    }))
}
