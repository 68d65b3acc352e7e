use std::{collections::HashMap, sync::Arc, time::Duration};

use abi_codec::{decode_decimals, decode_symbol, encode_call, Method};
use domain::{
    Address, CacheEntry, TokenMetadata, DEFAULT_TOKEN_SYMBOL, MAX_DECIMALS, METADATA_CACHE_VERSION,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use transport::{ChainResult, Transport};

use crate::{repositories::MetadataRepository, services::fallback::with_timeout};

pub struct MetadataCache {
    repo: Arc<dyn MetadataRepository>,
    entries: RwLock<HashMap<Address, TokenMetadata>>,
}

impl MetadataCache {
    pub async fn load(repo: Arc<dyn MetadataRepository>) -> Self {
        let entries = match repo.load().await {
            Ok(Some(text)) => parse_record(&text),
            Ok(None) => HashMap::new(),
            Err(err) => {
                warn!(error = %err, "metadata cache unreadable, starting empty");
                HashMap::new()
            }
        };
        info!(entries = entries.len(), "metadata cache loaded");
        Self {
            repo,
            entries: RwLock::new(entries),
        }
    }

    pub async fn get(&self, token: &Address) -> Option<TokenMetadata> {
        self.entries.read().await.get(token).cloned()
    }

    pub async fn set(&self, token: Address, metadata: TokenMetadata) {
        let mut entries = self.entries.write().await;
        entries.insert(token, metadata);
        self.persist(&entries).await;
    }

    pub async fn clear_one(&self, token: &Address) -> bool {
        let mut entries = self.entries.write().await;
        let removed = entries.remove(token).is_some();
        if removed {
            self.persist(&entries).await;
        }
        removed
    }

    pub async fn clear_all(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
        if let Err(err) = self.repo.clear().await {
            warn!(error = %err, "metadata cache clear failed");
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn label(&self, token: &Address) -> String {
        match self.get(token).await {
            Some(meta) if abi_codec::is_valid_symbol(&meta.symbol) => meta.symbol,
            _ => token.shortened(),
        }
    }

    // ⚠️ 只有 symbol 與 decimals 都讀到才寫入快取
    pub async fn resolve(
        &self,
        transport: &dyn Transport,
        token: &Address,
        call_timeout: Duration,
    ) -> TokenMetadata {
        if let Some(cached) = self.get(token).await {
            return cached;
        }

        let (symbol, decimals) = tokio::join!(
            read_symbol(transport, token, call_timeout),
            read_decimals(transport, token, call_timeout),
        );
        match (symbol, decimals) {
            (Ok(symbol), Ok(decimals)) => {
                let metadata = TokenMetadata { symbol, decimals };
                self.set(*token, metadata.clone()).await;
                debug!(token = %token, symbol = %metadata.symbol, "metadata cached");
                metadata
            }
            (symbol, decimals) => {
                let mut metadata = TokenMetadata::fallback();
                match symbol {
                    Ok(symbol) => metadata.symbol = symbol,
                    Err(err) => warn!(token = %token, error = %err, "symbol read failed"),
                }
                match decimals {
                    Ok(decimals) => metadata.decimals = decimals,
                    Err(err) => warn!(token = %token, error = %err, "decimals read failed"),
                }
                metadata
            }
        }
    }

    async fn persist(&self, entries: &HashMap<Address, TokenMetadata>) {
        let record = CacheEntry {
            version: METADATA_CACHE_VERSION.to_string(),
            data: entries
                .iter()
                .map(|(address, meta)| (address.to_string(), meta.clone()))
                .collect(),
        };
        let text = match serde_json::to_string(&record) {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "metadata cache serialization failed");
                return;
            }
        };
        if let Err(err) = self.repo.save(&text).await {
            warn!(error = %err, "metadata cache persist failed");
        }
    }
}

async fn read_symbol(
    transport: &dyn Transport,
    token: &Address,
    call_timeout: Duration,
) -> ChainResult<String> {
    let data = encode_call(Method::Symbol, &[])?;
    let reply = with_timeout(call_timeout, "symbol", transport.call(token, &data)).await?;
    Ok(decode_symbol(&reply, DEFAULT_TOKEN_SYMBOL))
}

async fn read_decimals(
    transport: &dyn Transport,
    token: &Address,
    call_timeout: Duration,
) -> ChainResult<u8> {
    let data = encode_call(Method::Decimals, &[])?;
    let reply = with_timeout(call_timeout, "decimals", transport.call(token, &data)).await?;
    Ok(decode_decimals(&reply)?)
}

/// 載入時丟掉無效的 key、超出範圍的 decimals 與不像 ticker 的 symbol。
pub fn parse_record(text: &str) -> HashMap<Address, TokenMetadata> {
    let record: CacheEntry = match serde_json::from_str(text) {
        Ok(record) => record,
        Err(err) => {
            warn!(error = %err, "metadata cache record unparseable, discarding");
            return HashMap::new();
        }
    };
    if record.version != METADATA_CACHE_VERSION {
        info!(
            found = %record.version,
            expected = METADATA_CACHE_VERSION,
            "metadata cache version mismatch, discarding"
        );
        return HashMap::new();
    }
    record
        .data
        .into_iter()
        .filter_map(|(key, meta)| {
            let address = match Address::normalize(&key) {
                Ok(address) => address,
                Err(err) => {
                    warn!(key = %key, error = %err, "dropping invalid metadata cache key");
                    return None;
                }
            };
            if meta.decimals > MAX_DECIMALS || !abi_codec::is_valid_symbol(&meta.symbol) {
                warn!(
                    token = %address,
                    symbol = %meta.symbol,
                    decimals = meta.decimals,
                    "dropping invalid metadata cache entry"
                );
                return None;
            }
            Some((address, meta))
        })
        .collect()
}
