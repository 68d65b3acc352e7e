use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::delete,
    Router,
};
use domain::Address;

use crate::{
    routes::{api_error, ApiResult},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/metadata", delete(clear_all))
        .route("/metadata/:address", delete(clear_one))
}

async fn clear_all(State(state): State<AppState>) -> StatusCode {
    state.engine.metadata().clear_all().await;
    StatusCode::NO_CONTENT
}

async fn clear_one(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<StatusCode> {
    let address = Address::normalize(&address)
        .map_err(|err| api_error(StatusCode::BAD_REQUEST, err.to_string()))?;
    if state.engine.metadata().clear_one(&address).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(
            StatusCode::NOT_FOUND,
            format!("no cached metadata for {address}"),
        ))
    }
}
