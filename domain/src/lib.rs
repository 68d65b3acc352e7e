use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use ethers::types::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const METADATA_CACHE_VERSION: &str = "v1";

/// Largest `decimals()` value that still fits a `uint256` amount.
pub const MAX_DECIMALS: u8 = 77;

pub const DEFAULT_TOKEN_SYMBOL: &str = "TOKEN";
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid address: must not be empty")]
    Empty,
    #[error("invalid address: must start with 0x")]
    MissingPrefix,
    #[error("invalid address: must be 42 characters (0x + 40 hex chars), got {0}")]
    Length(usize),
    #[error("invalid address: contains non-hex characters")]
    NonHex,
}

/// Lowercase `0x` + 40 hex digits, only built through [`Address::normalize`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn normalize(input: &str) -> Result<Self, AddressError> {
        let cleaned = input.trim().to_lowercase();
        if cleaned.is_empty() {
            return Err(AddressError::Empty);
        }
        if !cleaned.starts_with("0x") {
            return Err(AddressError::MissingPrefix);
        }
        let len = cleaned.chars().count();
        if len != 42 {
            return Err(AddressError::Length(len));
        }
        let digits = &cleaned[2..];
        if !digits.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(AddressError::NonHex);
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressError::NonHex)?;
        Ok(Self(bytes))
    }

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn hex_digits(&self) -> String {
        hex::encode(self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn shortened(&self) -> String {
        let digits = self.hex_digits();
        format!("0x{}...{}", &digits[..4], &digits[36..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.hex_digits())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::normalize(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: u8,
}

impl TokenMetadata {
    pub fn fallback() -> Self {
        Self {
            symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
            decimals: DEFAULT_TOKEN_DECIMALS,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CacheEntry {
    pub version: String,
    #[serde(default)]
    pub data: BTreeMap<String, TokenMetadata>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BalanceRecord {
    pub address: Address,
    #[serde(with = "u256_decimal")]
    pub raw_amount: U256,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub used_fallback: bool,
    /// Amount is the last known-good value, not this cycle's read.
    #[serde(default)]
    pub stale: bool,
}

impl BalanceRecord {
    pub fn is_available(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_unknown(&self) -> bool {
        self.error.is_some() && !self.stale
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Success,
    PartialFailure,
    CycleFailure,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SyncSnapshot {
    pub sequence: u64,
    pub status: SyncStatus,
    pub native: Option<BalanceRecord>,
    pub tokens: Vec<BalanceRecord>,
    /// Completion time of the last cycle that actually fetched.
    pub updated_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub live_updates: bool,
}

impl Default for SyncSnapshot {
    fn default() -> Self {
        Self {
            sequence: 0,
            status: SyncStatus::Pending,
            native: None,
            tokens: Vec::new(),
            updated_at: None,
            error: None,
            live_updates: true,
        }
    }
}

impl SyncSnapshot {
    pub fn token(&self, address: &Address) -> Option<&BalanceRecord> {
        self.tokens.iter().find(|record| &record.address == address)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
}

impl SessionState {
    pub fn connected(account: Address, chain_id: u64) -> Self {
        Self {
            account: Some(account),
            chain_id: Some(chain_id),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub account: String,
    pub chain_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct WatchedTokensRequest {
    pub tokens: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub token: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawNativeRequest {
    pub recipient: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawTokenRequest {
    pub token: String,
    pub recipient: String,
    pub amount: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TxHashResponse {
    pub tx_hash: String,
}

pub mod u256_decimal {
    use ethers::types::U256;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        U256::from_dec_str(raw.trim()).map_err(|err| D::Error::custom(format!("{err:?}")))
    }
}
