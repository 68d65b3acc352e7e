use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use domain::{Address, SessionRequest, SessionState};

use crate::{
    routes::{api_error, chain_error, ApiResult},
    services::Holder,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session", get(current).put(set_session).delete(disconnect))
        .route("/session/connect", post(connect))
}

async fn current(State(state): State<AppState>) -> Json<SessionState> {
    Json(state.engine.session().await)
}

async fn set_session(
    State(state): State<AppState>,
    Json(payload): Json<SessionRequest>,
) -> ApiResult<Json<SessionState>> {
    let account = Address::normalize(&payload.account)
        .map_err(|err| api_error(StatusCode::BAD_REQUEST, err.to_string()))?;
    let session = state.sessions.set(account, payload.chain_id).await;
    spawn_refresh(&state);
    Ok(Json(session))
}

async fn connect(State(state): State<AppState>) -> ApiResult<Json<SessionState>> {
    let session = state.sessions.connect().await.map_err(chain_error)?;
    spawn_refresh(&state);
    Ok(Json(session))
}

async fn disconnect(State(state): State<AppState>) -> StatusCode {
    state.sessions.disconnect().await;
    StatusCode::NO_CONTENT
}

pub(crate) fn spawn_refresh(state: &AppState) {
    let engine = state.engine.clone();
    tokio::spawn(async move {
        tokio::join!(
            engine.refresh_for(Holder::Vault),
            engine.refresh_for(Holder::Wallet)
        );
    });
}
