use std::sync::Arc;

use domain::{Address, SessionState};
use tracing::info;
use transport::{ChainError, ChainParams, ChainResult, WalletProvider};

use crate::services::balances::BalanceSyncEngine;

pub struct SessionService {
    wallet: Arc<dyn WalletProvider>,
    engine: Arc<BalanceSyncEngine>,
    chain: ChainParams,
}

impl SessionService {
    pub fn new(
        wallet: Arc<dyn WalletProvider>,
        engine: Arc<BalanceSyncEngine>,
        chain: ChainParams,
    ) -> Self {
        Self {
            wallet,
            engine,
            chain,
        }
    }

    // 不跳出授權視窗；沒有帳號就是未連線
    pub async fn restore(&self) -> ChainResult<SessionState> {
        let accounts = self.wallet.accounts(false).await?;
        let session = match accounts.first() {
            Some(account) => SessionState::connected(*account, self.wallet.chain_id().await?),
            None => SessionState::default(),
        };
        self.engine.set_session(session).await;
        Ok(session)
    }

    pub async fn connect(&self) -> ChainResult<SessionState> {
        let mut chain_id = self.wallet.chain_id().await?;
        if chain_id != self.chain.chain_id {
            info!(from = chain_id, to = self.chain.chain_id, "asking wallet to switch network");
            self.wallet.switch_chain(&self.chain).await?;
            chain_id = self.wallet.chain_id().await?;
        }
        let accounts = self.wallet.accounts(true).await?;
        let account = accounts
            .first()
            .copied()
            .ok_or_else(|| ChainError::Wallet("No accounts returned from wallet".to_string()))?;
        let session = SessionState::connected(account, chain_id);
        info!(account = %account, chain_id, "wallet connected");
        self.engine.set_session(session).await;
        Ok(session)
    }

    pub async fn set(&self, account: Address, chain_id: u64) -> SessionState {
        let session = SessionState::connected(account, chain_id);
        self.engine.set_session(session).await;
        session
    }

    pub async fn disconnect(&self) {
        self.engine.set_session(SessionState::default()).await;
    }
}
