use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use ethers::providers::{Http, Provider, ProviderError, RpcError};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{classify_rpc_error, ChainError, ChainResult};

#[async_trait]
pub trait JsonRpcHandle: Send + Sync {
    fn label(&self) -> &'static str;
    async fn request(&self, method: &str, params: Value) -> ChainResult<Value>;
}

pub struct DirectRpc {
    provider: Provider<Http>,
}

impl DirectRpc {
    pub fn new(url: &str) -> ChainResult<Self> {
        let provider = Provider::<Http>::try_from(url)
            .map_err(|err| ChainError::Network(format!("invalid RPC url {url}: {err}")))?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl JsonRpcHandle for DirectRpc {
    fn label(&self) -> &'static str {
        "rpc"
    }

    async fn request(&self, method: &str, params: Value) -> ChainResult<Value> {
        debug!(method, "direct rpc request");
        self.provider
            .request::<Value, Value>(method, params)
            .await
            .map_err(classify_provider_error)
    }
}

fn allows_null_result(method: &str) -> bool {
    matches!(
        method,
        "eth_getTransactionReceipt" | "wallet_switchEthereumChain" | "wallet_addEthereumChain"
    )
}

fn classify_provider_error(err: ProviderError) -> ChainError {
    if let Some(response) = err.as_error_response() {
        return classify_rpc_error(&json!({
            "code": response.code,
            "message": response.message,
            "data": response.data,
        }));
    }
    ChainError::Network(err.to_string())
}

/// 透過本機 wallet bridge 轉送 EIP-1193 JSON-RPC，私鑰留在 bridge 端。
pub struct WalletBridge {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl WalletBridge {
    pub fn new(url: impl Into<String>, timeout: Duration) -> ChainResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ChainError::Network(format!("wallet bridge client: {err}")))?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl JsonRpcHandle for WalletBridge {
    fn label(&self) -> &'static str {
        "injected"
    }

    async fn request(&self, method: &str, params: Value) -> ChainResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let resp = self
            .client
            .post(&self.url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await
            .map_err(|err| ChainError::Network(format!("wallet bridge unreachable: {err}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ChainError::Network(format!(
                "wallet bridge returned status {status}"
            )));
        }
        let mut body: Value = resp
            .json()
            .await
            .map_err(|err| ChainError::Network(format!("wallet bridge reply: {err}")))?;
        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            return Err(classify_rpc_error(error));
        }
        match body.get_mut("result").map(Value::take) {
            Some(result) if !result.is_null() || allows_null_result(method) => Ok(result),
            _ => Err(ChainError::Network(
                "No result returned from provider".to_string(),
            )),
        }
    }
}
