#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use abi_codec::{encode_call, encode_uint256, Method, Param};
use async_trait::async_trait;
use domain::Address;
use ethers::types::U256;
use transport::{
    ChainError, ChainParams, ChainResult, TransactionReceipt, TransactionRequest, Transport,
    WalletProvider,
};
use vault_api::{
    bootstrap::build_state_from_parts, config::AppConfig, repositories::InMemoryMetadataRepository,
    state::AppState,
};

pub const VAULT: &str = "0xd2e7da1e8e2cda1512a5cc9d1c477d95599f0ec4";
pub const ACCOUNT: &str = "0x1111111111111111111111111111111111111111";
pub const USDT: &str = "0x55d398326f99059ff775485246999027b3197955";
pub const USDC: &str = "0x8ac76a51cc950d9822d68b83fe1ad97b32cd580d";
pub const DAI: &str = "0x1af3f329e8be154074d8769d1ffa4ee058b1dbc3";

pub fn addr(raw: &str) -> Address {
    Address::normalize(raw).unwrap()
}

#[derive(Clone, Debug)]
pub enum Reply {
    Value(String),
    Fail(ChainError),
    /// Never answers within any sane call timeout.
    Hang,
}

pub fn uint_reply(value: u128) -> Reply {
    Reply::Value(format!("0x{}", encode_uint256(U256::from(value))))
}

pub fn symbol_reply(symbol: &str) -> Reply {
    let digits: String = symbol.bytes().map(|b| format!("{b:02x}")).collect();
    Reply::Value(format!("0x{digits:0<64}"))
}

pub fn reverted() -> Reply {
    Reply::Fail(ChainError::Reverted("execution reverted".to_string()))
}

/// Replies keyed by (contract, calldata).
#[derive(Default)]
pub struct FakeChain {
    calls: Mutex<HashMap<(Address, String), Reply>>,
    native: Mutex<Option<Reply>>,
    native_by: Mutex<HashMap<Address, Reply>>,
    counts: Mutex<HashMap<(Address, String), usize>>,
    native_calls: AtomicUsize,
    delay: Mutex<Option<Duration>>,
    active_vault_native: AtomicUsize,
    max_active_vault_native: AtomicUsize,
    pub sent: Mutex<Vec<TransactionRequest>>,
    receipt_success: Mutex<bool>,
    accounts: Mutex<Vec<Address>>,
    chain_id: Mutex<u64>,
    pub switches: Mutex<Vec<ChainParams>>,
    reject_switch: Mutex<bool>,
}

impl FakeChain {
    pub fn new() -> Arc<Self> {
        let chain = Self::default();
        *chain.receipt_success.lock().unwrap() = true;
        *chain.chain_id.lock().unwrap() = 56;
        *chain.accounts.lock().unwrap() = vec![addr(ACCOUNT)];
        Arc::new(chain)
    }

    pub fn set_call(&self, to: &str, method: Method, params: &[Param], reply: Reply) {
        let data = encode_call(method, params).unwrap();
        self.calls.lock().unwrap().insert((addr(to), data), reply);
    }

    pub fn set_native(&self, reply: Reply) {
        *self.native.lock().unwrap() = Some(reply);
    }

    pub fn set_native_for(&self, address: &str, reply: Reply) {
        self.native_by.lock().unwrap().insert(addr(address), reply);
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        *self.chain_id.lock().unwrap() = chain_id;
    }

    pub fn set_reject_switch(&self, reject: bool) {
        *self.reject_switch.lock().unwrap() = reject;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn set_receipt_success(&self, success: bool) {
        *self.receipt_success.lock().unwrap() = success;
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        *self.accounts.lock().unwrap() = accounts;
    }

    pub fn token(&self, token: &str, symbol: &str, decimals: u128, vault_amount: u128) {
        self.set_call(token, Method::Symbol, &[], symbol_reply(symbol));
        self.set_call(token, Method::Decimals, &[], uint_reply(decimals));
        self.set_call(
            VAULT,
            Method::TokenBalance,
            &[Param::Address(addr(token))],
            uint_reply(vault_amount),
        );
    }

    pub fn count(&self, to: &str, method: Method, params: &[Param]) -> usize {
        let data = encode_call(method, params).unwrap();
        self.counts
            .lock()
            .unwrap()
            .get(&(addr(to), data))
            .copied()
            .unwrap_or(0)
    }

    pub fn native_calls(&self) -> usize {
        self.native_calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_cycles(&self) -> usize {
        self.max_active_vault_native.load(Ordering::SeqCst)
    }

    async fn answer(reply: Reply) -> ChainResult<String> {
        match reply {
            Reply::Value(value) => Ok(value),
            Reply::Fail(err) => Err(err),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ChainError::Network("hung call finished".to_string()))
            }
        }
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Transport for FakeChain {
    async fn call(&self, to: &Address, data: &str) -> ChainResult<String> {
        let key = (*to, data.to_string());
        *self.counts.lock().unwrap().entry(key.clone()).or_default() += 1;
        let reply = self
            .calls
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(reverted);

        let tracks_cycle = to.to_string() == VAULT && data == Method::NativeBalance.selector();
        if tracks_cycle {
            let active = self.active_vault_native.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active_vault_native
                .fetch_max(active, Ordering::SeqCst);
        }
        self.pause().await;
        if tracks_cycle {
            self.active_vault_native.fetch_sub(1, Ordering::SeqCst);
        }
        Self::answer(reply).await
    }

    async fn native_balance(&self, address: &Address) -> ChainResult<U256> {
        self.native_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.native_by.lock().unwrap().get(address).cloned();
        let reply = scripted
            .or_else(|| self.native.lock().unwrap().clone())
            .unwrap_or_else(reverted);
        self.pause().await;
        let raw = Self::answer(reply).await?;
        transport::parse_quantity(&raw)
    }
}

#[async_trait]
impl WalletProvider for FakeChain {
    async fn chain_id(&self) -> ChainResult<u64> {
        Ok(*self.chain_id.lock().unwrap())
    }

    async fn switch_chain(&self, chain: &ChainParams) -> ChainResult<()> {
        self.switches.lock().unwrap().push(chain.clone());
        if *self.reject_switch.lock().unwrap() {
            return Err(ChainError::Wallet("User rejected the request.".to_string()));
        }
        self.set_chain_id(chain.chain_id);
        Ok(())
    }

    async fn accounts(&self, _prompt: bool) -> ChainResult<Vec<Address>> {
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> ChainResult<String> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(tx.clone());
        Ok(format!("0x{:064x}", sent.len()))
    }

    async fn transaction_receipt(&self, _hash: &str) -> ChainResult<Option<TransactionReceipt>> {
        Ok(Some(TransactionReceipt {
            success: *self.receipt_success.lock().unwrap(),
            block_number: Some(1),
        }))
    }
}

pub fn test_config(tokens: &[&str]) -> AppConfig {
    AppConfig {
        rpc_url: "http://localhost:8545".to_string(),
        wallet_bridge_url: None,
        vault_address: addr(VAULT),
        chain_id: 56,
        chain_name: "Binance Smart Chain".to_string(),
        explorer_url: None,
        native_symbol: "BNB".to_string(),
        call_timeout: Duration::from_secs(15),
        poll_interval: Duration::from_secs(10),
        receipt_timeout: Duration::from_secs(30),
        watched_tokens: tokens.iter().map(|t| addr(t)).collect(),
        metadata_cache_path: PathBuf::from("unused.json"),
        connected_account: Some(addr(ACCOUNT)),
        live_updates: true,
        enable_poller: false,
        frontend_origins: vec!["http://localhost:3000".to_string()],
        port: 0,
    }
}

pub async fn test_state(
    config: &AppConfig,
    chain: Arc<FakeChain>,
    repo: Arc<InMemoryMetadataRepository>,
) -> AppState {
    build_state_from_parts(config, chain.clone(), chain, repo).await
}
