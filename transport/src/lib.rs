pub mod error;
pub mod handles;

use std::sync::Arc;

use async_trait::async_trait;
use domain::Address;
use ethers::types::U256;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub use error::{classify_rpc_error, unwrap_error_message, ChainError, ChainResult, ErrorKind};
pub use handles::{DirectRpc, JsonRpcHandle, WalletBridge};

// ⚠️ revert 或合約沒有該方法時，eth_call 回傳 "0x"
pub const EMPTY_RETURN: &str = "0x";

#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, to: &Address, data: &str) -> ChainResult<String>;
    async fn native_balance(&self, address: &Address) -> ChainResult<U256>;
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn chain_id(&self) -> ChainResult<u64>;
    async fn switch_chain(&self, chain: &ChainParams) -> ChainResult<()>;
    /// `prompt` 會走 eth_requestAccounts 要求授權。
    async fn accounts(&self, prompt: bool) -> ChainResult<Vec<Address>>;
    async fn send_transaction(&self, tx: &TransactionRequest) -> ChainResult<String>;
    async fn transaction_receipt(&self, hash: &str) -> ChainResult<Option<TransactionReceipt>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainParams {
    pub chain_id: u64,
    pub chain_name: String,
    pub native_symbol: String,
    pub rpc_url: String,
    pub explorer_url: Option<String>,
}

impl ChainParams {
    pub fn hex_id(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }

    fn add_chain_request(&self) -> Value {
        json!([{
            "chainId": self.hex_id(),
            "chainName": self.chain_name,
            "nativeCurrency": {
                "name": self.native_symbol,
                "symbol": self.native_symbol,
                "decimals": 18,
            },
            "rpcUrls": [self.rpc_url],
            "blockExplorerUrls": self.explorer_url.iter().collect::<Vec<_>>(),
        }])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: String,
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub success: bool,
    pub block_number: Option<u64>,
}

#[derive(Clone)]
pub struct FallbackTransport {
    injected: Option<Arc<dyn JsonRpcHandle>>,
    direct: Arc<dyn JsonRpcHandle>,
}

impl FallbackTransport {
    pub fn new(injected: Option<Arc<dyn JsonRpcHandle>>, direct: Arc<dyn JsonRpcHandle>) -> Self {
        if injected.is_none() {
            warn!("no injected provider configured; reads go straight to the RPC endpoint");
        }
        Self { injected, direct }
    }

    pub fn has_injected(&self) -> bool {
        self.injected.is_some()
    }

    async fn read(&self, method: &str, params: Value) -> ChainResult<Value> {
        match &self.injected {
            Some(injected) => match injected.request(method, params.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) => warn!(
                    error = %err,
                    method,
                    provider = injected.label(),
                    "injected provider failed, falling back to rpc"
                ),
            },
            None => debug!(method, "no injected provider, using rpc"),
        }
        self.direct.request(method, params).await
    }

    fn signer(&self) -> ChainResult<&Arc<dyn JsonRpcHandle>> {
        self.injected
            .as_ref()
            .ok_or_else(|| ChainError::Wallet("EVM wallet is not installed".to_string()))
    }
}

fn hex_result(value: Value, method: &str) -> ChainResult<String> {
    let Some(text) = value.as_str() else {
        return Err(ChainError::Decode(format!("{method} returned non-string {value}")));
    };
    if text == EMPTY_RETURN {
        return Err(ChainError::Reverted(format!(
            "{method} returned empty data (reverted or unsupported method)"
        )));
    }
    Ok(text.to_string())
}

pub fn parse_quantity(raw: &str) -> ChainResult<U256> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::Decode(format!("quantity without 0x prefix: {raw}")))?;
    if digits.is_empty() {
        return Err(ChainError::Decode("empty quantity".to_string()));
    }
    U256::from_str_radix(digits, 16)
        .map_err(|err| ChainError::Decode(format!("invalid quantity {raw}: {err:?}")))
}

#[async_trait]
impl Transport for FallbackTransport {
    async fn call(&self, to: &Address, data: &str) -> ChainResult<String> {
        let params = json!([{ "to": to.to_string(), "data": data }, "latest"]);
        hex_result(self.read("eth_call", params).await?, "eth_call")
    }

    async fn native_balance(&self, address: &Address) -> ChainResult<U256> {
        let params = json!([address.to_string(), "latest"]);
        let raw = hex_result(self.read("eth_getBalance", params).await?, "eth_getBalance")?;
        parse_quantity(&raw)
    }
}

#[async_trait]
impl WalletProvider for FallbackTransport {
    async fn chain_id(&self) -> ChainResult<u64> {
        let value = self.signer()?.request("eth_chainId", json!([])).await?;
        let raw = hex_result(value, "eth_chainId")?;
        let id = parse_quantity(&raw)?;
        if id > U256::from(u64::MAX) {
            return Err(ChainError::Decode(format!("chain id out of range: {raw}")));
        }
        Ok(id.as_u64())
    }

    async fn switch_chain(&self, chain: &ChainParams) -> ChainResult<()> {
        let signer = self.signer()?;
        let switch = json!([{ "chainId": chain.hex_id() }]);
        match signer.request("wallet_switchEthereumChain", switch).await {
            Ok(_) => Ok(()),
            Err(ChainError::UnknownChain(_)) => {
                info!(chain_id = chain.chain_id, "wallet lacks chain, adding it");
                signer
                    .request("wallet_addEthereumChain", chain.add_chain_request())
                    .await
                    .map_err(|err| {
                        ChainError::Wallet(format!("Failed to add {} network: {err}", chain.chain_name))
                    })?;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn accounts(&self, prompt: bool) -> ChainResult<Vec<Address>> {
        let method = if prompt {
            "eth_requestAccounts"
        } else {
            "eth_accounts"
        };
        let value = self.signer()?.request(method, json!([])).await?;
        let Some(list) = value.as_array() else {
            return Err(ChainError::Decode(format!("{method} returned {value}")));
        };
        list.iter()
            .map(|entry| {
                let text = entry
                    .as_str()
                    .ok_or_else(|| ChainError::Decode(format!("account entry {entry}")))?;
                Ok(Address::normalize(text)?)
            })
            .collect()
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> ChainResult<String> {
        let params = json!([{
            "from": tx.from.to_string(),
            "to": tx.to.to_string(),
            "data": tx.data,
            "value": format!("0x{:x}", tx.value),
        }]);
        let value = self.signer()?.request("eth_sendTransaction", params).await?;
        hex_result(value, "eth_sendTransaction")
    }

    async fn transaction_receipt(&self, hash: &str) -> ChainResult<Option<TransactionReceipt>> {
        let value = self.read("eth_getTransactionReceipt", json!([hash])).await?;
        if value.is_null() {
            return Ok(None);
        }
        let success = match value.get("status").and_then(Value::as_str) {
            Some(status) => parse_quantity(status)? == U256::one(),
            // pre-Byzantium receipts carry no status
            None => true,
        };
        let block_number = match value.get("blockNumber").and_then(Value::as_str) {
            Some(raw) => Some(parse_quantity(raw)?.low_u64()),
            None => None,
        };
        Ok(Some(TransactionReceipt {
            success,
            block_number,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    struct ScriptedHandle {
        label: &'static str,
        replies: Mutex<VecDeque<ChainResult<Value>>>,
        calls: AtomicUsize,
        methods: Mutex<Vec<String>>,
    }

    impl ScriptedHandle {
        fn new(label: &'static str, replies: Vec<ChainResult<Value>>) -> Arc<Self> {
            Arc::new(Self {
                label,
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
                methods: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JsonRpcHandle for ScriptedHandle {
        fn label(&self) -> &'static str {
            self.label
        }

        async fn request(&self, method: &str, _params: Value) -> ChainResult<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.methods.lock().unwrap().push(method.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ChainError::Network("script exhausted".to_string())))
        }
    }

    fn vault() -> Address {
        Address::normalize("0xd2e7da1e8e2cda1512a5cc9d1c477d95599f0ec4").unwrap()
    }

    #[tokio::test]
    async fn falls_back_to_rpc_when_injected_fails() {
        let injected =
            ScriptedHandle::new("injected", vec![Err(ChainError::Network("down".into()))]);
        let direct = ScriptedHandle::new("rpc", vec![Ok(json!("0x01"))]);
        let transport = FallbackTransport::new(Some(injected.clone()), direct.clone());

        let reply = transport.call(&vault(), "0x7bb98a68").await.unwrap();
        assert_eq!(reply, "0x01");
        assert_eq!(injected.calls(), 1);
        assert_eq!(direct.calls(), 1);
    }

    #[tokio::test]
    async fn missing_injected_provider_goes_to_rpc() {
        let direct = ScriptedHandle::new("rpc", vec![Ok(json!("0xde0b6b3a7640000"))]);
        let transport = FallbackTransport::new(None, direct.clone());
        let balance = transport.native_balance(&vault()).await.unwrap();
        assert_eq!(balance, U256::from(1_000_000_000_000_000_000u64));
        assert_eq!(direct.methods.lock().unwrap().as_slice(), ["eth_getBalance"]);
    }

    #[tokio::test]
    async fn empty_return_is_a_revert_without_retry() {
        let injected = ScriptedHandle::new("injected", vec![Ok(json!("0x"))]);
        let direct = ScriptedHandle::new("rpc", vec![Ok(json!("0x01"))]);
        let transport = FallbackTransport::new(Some(injected), direct.clone());

        let err = transport.call(&vault(), "0x7bb98a68").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Revert);
        assert_eq!(direct.calls(), 0);
    }

    #[tokio::test]
    async fn both_paths_failing_surfaces_rpc_error() {
        let injected = ScriptedHandle::new("injected", vec![Err(ChainError::Network("a".into()))]);
        let direct =
            ScriptedHandle::new("rpc", vec![Err(ChainError::Reverted("not owner".into()))]);
        let transport = FallbackTransport::new(Some(injected), direct);
        assert_eq!(
            transport.call(&vault(), "0x8da5cb5b").await,
            Err(ChainError::Reverted("not owner".into()))
        );
    }

    #[tokio::test]
    async fn signing_requires_injected_provider() {
        let direct = ScriptedHandle::new("rpc", vec![]);
        let transport = FallbackTransport::new(None, direct.clone());
        let tx = TransactionRequest {
            from: vault(),
            to: vault(),
            data: "0x".to_string(),
            value: U256::zero(),
        };
        assert_eq!(
            transport.send_transaction(&tx).await.unwrap_err().kind(),
            ErrorKind::Wallet
        );
        assert_eq!(direct.calls(), 0);
    }

    fn bsc() -> ChainParams {
        ChainParams {
            chain_id: 56,
            chain_name: "Binance Smart Chain".to_string(),
            native_symbol: "BNB".to_string(),
            rpc_url: "https://bsc-dataseed1.binance.org:443".to_string(),
            explorer_url: Some("https://bscscan.com/".to_string()),
        }
    }

    #[tokio::test]
    async fn switch_adds_chain_the_wallet_does_not_know() {
        let injected = ScriptedHandle::new(
            "injected",
            vec![
                Err(ChainError::UnknownChain("Unrecognized chain ID".into())),
                Ok(Value::Null),
            ],
        );
        let transport = FallbackTransport::new(Some(injected.clone()), ScriptedHandle::new("rpc", vec![]));
        transport.switch_chain(&bsc()).await.unwrap();
        assert_eq!(
            injected.methods.lock().unwrap().as_slice(),
            ["wallet_switchEthereumChain", "wallet_addEthereumChain"]
        );
        assert_eq!(bsc().hex_id(), "0x38");
    }

    #[tokio::test]
    async fn switch_rejection_is_not_retried() {
        let injected = ScriptedHandle::new(
            "injected",
            vec![Err(ChainError::Wallet("User rejected the request.".into()))],
        );
        let transport = FallbackTransport::new(Some(injected.clone()), ScriptedHandle::new("rpc", vec![]));
        let err = transport.switch_chain(&bsc()).await.unwrap_err();
        assert_eq!(err, ChainError::Wallet("User rejected the request.".into()));
        assert_eq!(injected.calls(), 1);
    }

    #[tokio::test]
    async fn parses_accounts_chain_and_receipt() {
        let injected = ScriptedHandle::new(
            "injected",
            vec![
                Ok(json!("0x38")),
                Ok(json!(["0xD2E7DA1E8E2CDA1512A5CC9D1C477D95599F0EC4"])),
                Ok(json!({ "status": "0x0", "blockNumber": "0x10" })),
            ],
        );
        let transport = FallbackTransport::new(Some(injected), ScriptedHandle::new("rpc", vec![]));
        assert_eq!(transport.chain_id().await.unwrap(), 56);
        assert_eq!(transport.accounts(true).await.unwrap(), vec![vault()]);
        assert_eq!(
            transport.transaction_receipt("0xabc").await.unwrap(),
            Some(TransactionReceipt {
                success: false,
                block_number: Some(16)
            })
        );
    }
}
