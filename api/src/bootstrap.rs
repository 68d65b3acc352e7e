use std::sync::Arc;

use anyhow::{Context, Result};
use domain::SessionState;
use tracing::{info, warn};
use transport::{DirectRpc, FallbackTransport, JsonRpcHandle, Transport, WalletBridge, WalletProvider};

use crate::{
    config::AppConfig,
    repositories::{FileMetadataRepository, MetadataRepository},
    services::{BalanceSyncEngine, EngineSettings, MetadataCache, SessionService, VaultOperations},
    state::AppState,
};

pub async fn build_state(config: &AppConfig) -> Result<AppState> {
    let transport = Arc::new(build_transport(config)?);
    let has_wallet = transport.has_injected();
    let repo = Arc::new(FileMetadataRepository::new(&config.metadata_cache_path));

    let state = build_state_from_parts(config, transport.clone(), transport, repo).await;

    if config.connected_account.is_none() && has_wallet {
        match state.sessions.restore().await {
            Ok(session) => info!(account = ?session.account, "wallet session restored"),
            Err(err) => warn!(error = %err, "wallet session restore failed"),
        }
    }
    if config.enable_poller {
        state.engine.clone().spawn_poller();
    }
    Ok(state)
}

pub fn build_transport(config: &AppConfig) -> Result<FallbackTransport> {
    let direct: Arc<dyn JsonRpcHandle> = Arc::new(
        DirectRpc::new(&config.rpc_url).with_context(|| format!("RPC_URL {}", config.rpc_url))?,
    );
    let injected = match &config.wallet_bridge_url {
        Some(url) => {
            let bridge = WalletBridge::new(url.clone(), config.call_timeout)
                .with_context(|| format!("WALLET_BRIDGE_URL {url}"))?;
            Some(Arc::new(bridge) as Arc<dyn JsonRpcHandle>)
        }
        None => None,
    };
    Ok(FallbackTransport::new(injected, direct))
}

/// 只組裝 state，不啟動任何背景任務。
pub async fn build_state_from_parts(
    config: &AppConfig,
    transport: Arc<dyn Transport>,
    wallet: Arc<dyn WalletProvider>,
    repo: Arc<dyn MetadataRepository>,
) -> AppState {
    let metadata = Arc::new(MetadataCache::load(repo).await);
    let engine = Arc::new(BalanceSyncEngine::new(
        transport.clone(),
        metadata,
        EngineSettings {
            vault: config.vault_address,
            expected_chain_id: config.chain_id,
            native_symbol: config.native_symbol.clone(),
            call_timeout: config.call_timeout,
            poll_interval: config.poll_interval,
        },
        config.live_updates,
    ));
    engine
        .set_watched_tokens(config.watched_tokens.clone())
        .await;
    if let Some(account) = config.connected_account {
        engine
            .set_session(SessionState::connected(account, config.chain_id))
            .await;
    }

    let sessions = Arc::new(SessionService::new(
        wallet.clone(),
        engine.clone(),
        config.chain_params(),
    ));
    let operations = Arc::new(VaultOperations::new(
        wallet,
        transport,
        engine.clone(),
        config.receipt_timeout,
    ));

    AppState {
        config: config.clone(),
        engine,
        sessions,
        operations,
    }
}
