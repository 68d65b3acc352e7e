use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use domain::{Address, WatchedTokensRequest};
use serde::Serialize;

use crate::{
    routes::{api_error, ApiResult},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/tokens", get(list_tokens).put(replace_tokens))
}

#[derive(Debug, Serialize)]
pub struct WatchedToken {
    pub address: Address,
    pub label: String,
}

async fn describe(state: &AppState, tokens: Vec<Address>) -> Vec<WatchedToken> {
    let metadata = state.engine.metadata();
    let mut out = Vec::with_capacity(tokens.len());
    for address in tokens {
        out.push(WatchedToken {
            label: metadata.label(&address).await,
            address,
        });
    }
    out
}

async fn list_tokens(State(state): State<AppState>) -> Json<Vec<WatchedToken>> {
    let tokens = state.engine.watched_tokens().await;
    Json(describe(&state, tokens).await)
}

async fn replace_tokens(
    State(state): State<AppState>,
    Json(payload): Json<WatchedTokensRequest>,
) -> ApiResult<Json<Vec<WatchedToken>>> {
    let tokens = payload
        .tokens
        .iter()
        .map(|raw| {
            Address::normalize(raw)
                .map_err(|err| api_error(StatusCode::BAD_REQUEST, format!("{raw}: {err}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let tokens = state.engine.set_watched_tokens(tokens).await;
    Ok(Json(describe(&state, tokens).await))
}
