use abi_codec::AbiError;
use domain::AddressError;
use serde_json::Value;
use thiserror::Error;

const REVERT_MARKER: &str = "execution reverted:";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),
    #[error("{0}")]
    Timeout(String),
    #[error("{0}")]
    Reverted(String),
    #[error("{0}")]
    Network(String),
    #[error("{0}")]
    Decode(String),
    #[error("{0}")]
    Wallet(String),
    // EIP-1193 code 4902
    #[error("{0}")]
    UnknownChain(String),
}

pub type ChainResult<T> = Result<T, ChainError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidAddress,
    Timeout,
    Revert,
    Network,
    Decode,
    Wallet,
}

impl ChainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChainError::InvalidAddress(_) => ErrorKind::InvalidAddress,
            ChainError::Timeout(_) => ErrorKind::Timeout,
            ChainError::Reverted(_) => ErrorKind::Revert,
            ChainError::Network(_) => ErrorKind::Network,
            ChainError::Decode(_) => ErrorKind::Decode,
            ChainError::Wallet(_) | ChainError::UnknownChain(_) => ErrorKind::Wallet,
        }
    }
}

impl From<AbiError> for ChainError {
    fn from(err: AbiError) -> Self {
        match err {
            AbiError::InvalidAddress(inner) => ChainError::InvalidAddress(inner),
            other => ChainError::Decode(other.to_string()),
        }
    }
}

/// 錢包把訊息包在不同層 (data.message / error.message / message)，取第一個非空的。
pub fn unwrap_error_message(envelope: &Value) -> String {
    let message = ["/data/message", "/error/message", "/message"]
        .iter()
        .filter_map(|pointer| envelope.pointer(pointer).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .or_else(|| envelope.as_str().map(str::trim).filter(|s| !s.is_empty()));

    let Some(message) = message else {
        return "Contract call failed".to_string();
    };
    match extract_revert_reason(message) {
        Some(reason) => reason,
        None => message.to_string(),
    }
}

fn extract_revert_reason(message: &str) -> Option<String> {
    let (_, reason) = message.split_once(REVERT_MARKER)?;
    let reason = reason.trim();
    if reason.is_empty() {
        Some("Contract execution reverted".to_string())
    } else {
        Some(reason.to_string())
    }
}

pub fn classify_rpc_error(envelope: &Value) -> ChainError {
    let message = unwrap_error_message(envelope);
    let code = envelope.get("code").and_then(Value::as_i64);
    let raw = envelope.to_string().to_lowercase();
    if code == Some(3) || raw.contains("revert") {
        return ChainError::Reverted(message);
    }
    match code {
        Some(4001) => return ChainError::Wallet(message),
        Some(4902) => return ChainError::UnknownChain(message),
        _ => {}
    }
    ChainError::Network(message)
}
