pub mod balances;
pub mod health;
pub mod metadata;
pub mod session;
pub mod tokens;
pub mod vault;
pub mod wallet;

use axum::{http::StatusCode, Json};
use serde::Serialize;
use transport::{ChainError, ErrorKind};

use crate::services::OperationError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<T, ApiError>;

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn chain_error(err: ChainError) -> ApiError {
    let status = match err.kind() {
        ErrorKind::InvalidAddress => StatusCode::BAD_REQUEST,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Revert => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Wallet => StatusCode::CONFLICT,
        ErrorKind::Network | ErrorKind::Decode => StatusCode::BAD_GATEWAY,
    };
    api_error(status, err.to_string())
}

pub fn operation_error(err: OperationError) -> ApiError {
    match err {
        OperationError::NotConnected => api_error(StatusCode::CONFLICT, err.to_string()),
        OperationError::InvalidInput(_) | OperationError::ZeroAmount => {
            api_error(StatusCode::BAD_REQUEST, err.to_string())
        }
        OperationError::Reverted(_) => api_error(StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
        OperationError::ReceiptTimeout(_) => api_error(StatusCode::GATEWAY_TIMEOUT, err.to_string()),
        OperationError::Chain(inner) => chain_error(inner),
    }
}
