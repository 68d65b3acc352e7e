use std::{env, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use domain::Address;
use tracing::warn;
use transport::ChainParams;

pub const DEFAULT_RPC_URL: &str = "https://bsc-dataseed1.binance.org:443";
pub const DEFAULT_VAULT_ADDRESS: &str = "0xd2e7da1e8e2cda1512a5cc9d1c477d95599f0ec4";
pub const DEFAULT_CHAIN_ID: u64 = 56;
pub const DEFAULT_CHAIN_NAME: &str = "Binance Smart Chain";
pub const DEFAULT_EXPLORER_URL: &str = "https://bscscan.com/";

// USDT, USDC, WBTC, DAI, ETH, WBNB
pub const DEFAULT_BSC_TOKENS: [&str; 6] = [
    "0x55d398326f99059ff775485246999027b3197955",
    "0x8ac76a51cc950d9822d68b83fe1ad97b32cd580d",
    "0x7130d2a12b9bcbfae4f2634d864a1ee1ce3ead9c",
    "0x1af3f329e8be154074d8769d1ffa4ee058b1dbc3",
    "0x2170ed0880ac9a755fd29b2688956bd959f933f8",
    "0xbb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c",
];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub rpc_url: String,
    pub wallet_bridge_url: Option<String>,
    pub vault_address: Address,
    pub chain_id: u64,
    pub chain_name: String,
    pub explorer_url: Option<String>,
    pub native_symbol: String,
    pub call_timeout: Duration,
    pub poll_interval: Duration,
    pub receipt_timeout: Duration,
    pub watched_tokens: Vec<Address>,
    pub metadata_cache_path: PathBuf,
    pub connected_account: Option<Address>,
    pub live_updates: bool,
    pub enable_poller: bool,
    pub frontend_origins: Vec<String>,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let vault_address = match env::var("VAULT_ADDRESS") {
            Ok(raw) => Address::normalize(&raw).context("VAULT_ADDRESS must be a valid address")?,
            Err(_) => Address::normalize(DEFAULT_VAULT_ADDRESS)?,
        };
        let connected_account = match env::var("CONNECTED_ACCOUNT") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                Address::normalize(&raw).context("CONNECTED_ACCOUNT must be a valid address")?,
            ),
            _ => None,
        };
        let watched_tokens = match env::var("WATCHED_TOKENS") {
            Ok(raw) => parse_watched_tokens(&raw),
            Err(_) => parse_watched_tokens(&DEFAULT_BSC_TOKENS.join(",")),
        };

        Ok(Self {
            rpc_url: env::var("RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string()),
            wallet_bridge_url: env::var("WALLET_BRIDGE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            vault_address,
            chain_id: env::var("CHAIN_ID")
                .ok()
                .map(|raw| raw.trim().parse::<u64>())
                .transpose()
                .context("CHAIN_ID must be an integer")?
                .unwrap_or(DEFAULT_CHAIN_ID),
            chain_name: env::var("CHAIN_NAME").unwrap_or_else(|_| DEFAULT_CHAIN_NAME.to_string()),
            explorer_url: match env::var("EXPLORER_URL") {
                Ok(url) if url.trim().is_empty() => None,
                Ok(url) => Some(url),
                Err(_) => Some(DEFAULT_EXPLORER_URL.to_string()),
            },
            native_symbol: env::var("NATIVE_SYMBOL").unwrap_or_else(|_| "BNB".to_string()),
            call_timeout: parse_duration_seconds("CALL_TIMEOUT_SECS", 15),
            poll_interval: parse_duration_seconds("POLL_INTERVAL_SECS", 10),
            receipt_timeout: parse_duration_seconds("RECEIPT_TIMEOUT_SECS", 120),
            watched_tokens,
            metadata_cache_path: env::var("METADATA_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("token_metadata_cache.json")),
            connected_account,
            live_updates: parse_bool("LIVE_UPDATES", true),
            enable_poller: parse_bool("ENABLE_POLLER", true),
            frontend_origins: parse_origins(),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8081".to_string())
                .parse()
                .context("PORT must be a valid u16")?,
        })
    }

    pub fn chain_params(&self) -> ChainParams {
        ChainParams {
            chain_id: self.chain_id,
            chain_name: self.chain_name.clone(),
            native_symbol: self.native_symbol.clone(),
            rpc_url: self.rpc_url.clone(),
            explorer_url: self.explorer_url.clone(),
        }
    }
}

pub fn parse_watched_tokens(raw: &str) -> Vec<Address> {
    let mut tokens: Vec<Address> = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        match Address::normalize(item) {
            Ok(address) if !tokens.contains(&address) => tokens.push(address),
            Ok(_) => {}
            Err(err) => warn!(error = %err, entry = item, "skipping watched token"),
        }
    }
    tokens
}

fn parse_origins() -> Vec<String> {
    match env::var("FRONTEND_ORIGINS") {
        Ok(list) => split_origins(&list),
        Err(_) => vec!["http://localhost:3000".to_string()],
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|item| {
            let trimmed = item.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

fn parse_duration_seconds(key: &str, default: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default))
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "on"))
        .unwrap_or(default)
}
