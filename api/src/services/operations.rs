use std::{sync::Arc, time::Duration};

use abi_codec::{address_from_word, encode_call, parse_units, AbiError, Method, Param};
use domain::{Address, DEFAULT_TOKEN_DECIMALS};
use ethers::types::U256;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use transport::{ChainError, TransactionRequest, Transport, WalletProvider};

use crate::services::{balances::BalanceSyncEngine, fallback::with_timeout, metadata::MetadataCache};

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("wallet not connected")]
    NotConnected,
    #[error(transparent)]
    InvalidInput(#[from] AbiError),
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("transaction {0} reverted")]
    Reverted(String),
    #[error("timed out waiting for receipt of {0}")]
    ReceiptTimeout(String),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

pub type OperationResult<T> = Result<T, OperationError>;

pub struct VaultOperations {
    wallet: Arc<dyn WalletProvider>,
    transport: Arc<dyn Transport>,
    engine: Arc<BalanceSyncEngine>,
    metadata: Arc<MetadataCache>,
    vault: Address,
    call_timeout: Duration,
    receipt_timeout: Duration,
}

impl VaultOperations {
    pub fn new(
        wallet: Arc<dyn WalletProvider>,
        transport: Arc<dyn Transport>,
        engine: Arc<BalanceSyncEngine>,
        receipt_timeout: Duration,
    ) -> Self {
        let settings = engine.settings().clone();
        Self {
            wallet,
            transport,
            metadata: engine.metadata().clone(),
            engine,
            vault: settings.vault,
            call_timeout: settings.call_timeout,
            receipt_timeout,
        }
    }

    pub async fn owner(&self) -> OperationResult<Address> {
        let data = encode_call(Method::Owner, &[])?;
        let reply = with_timeout(
            self.call_timeout,
            "owner",
            self.transport.call(&self.vault, &data),
        )
        .await?;
        Ok(address_from_word(&reply))
    }

    /// approve → 等 receipt → depositToken，回傳 deposit 的 tx hash。
    pub async fn deposit_token(&self, token: &str, amount: &str) -> OperationResult<String> {
        let from = self.connected_account().await?;
        let token = Address::normalize(token).map_err(AbiError::from)?;
        let raw = self.parse_amount(amount, self.token_decimals(&token).await)?;

        let approve = encode_call(
            Method::Approve,
            &[Param::Address(self.vault), Param::Uint256(raw)],
        )?;
        let approval = self.send(from, token, approve).await?;
        info!(token = %token, tx_hash = %approval, "approval submitted");
        self.wait_for_receipt(&approval).await?;

        let deposit = encode_call(
            Method::DepositToken,
            &[Param::Address(token), Param::Uint256(raw)],
        )?;
        let hash = self.send(from, self.vault, deposit).await?;
        info!(token = %token, amount = %raw, tx_hash = %hash, "deposit submitted");
        Ok(hash)
    }

    pub async fn withdraw_native(&self, recipient: &str, amount: &str) -> OperationResult<String> {
        let from = self.connected_account().await?;
        let recipient = Address::normalize(recipient).map_err(AbiError::from)?;
        let raw = self.parse_amount(amount, DEFAULT_TOKEN_DECIMALS)?;
        let data = encode_call(
            Method::WithdrawNative,
            &[Param::Address(recipient), Param::Uint256(raw)],
        )?;
        let hash = self.send(from, self.vault, data).await?;
        info!(recipient = %recipient, amount = %raw, tx_hash = %hash, "native withdrawal submitted");
        Ok(hash)
    }

    pub async fn withdraw_token(
        &self,
        token: &str,
        recipient: &str,
        amount: &str,
    ) -> OperationResult<String> {
        let from = self.connected_account().await?;
        let token = Address::normalize(token).map_err(AbiError::from)?;
        let recipient = Address::normalize(recipient).map_err(AbiError::from)?;
        let raw = self.parse_amount(amount, self.token_decimals(&token).await)?;
        let data = encode_call(
            Method::WithdrawToken,
            &[
                Param::Address(token),
                Param::Address(recipient),
                Param::Uint256(raw),
            ],
        )?;
        let hash = self.send(from, self.vault, data).await?;
        info!(token = %token, recipient = %recipient, amount = %raw, tx_hash = %hash, "token withdrawal submitted");
        Ok(hash)
    }

    async fn connected_account(&self) -> OperationResult<Address> {
        self.engine
            .session()
            .await
            .account
            .ok_or(OperationError::NotConnected)
    }

    async fn token_decimals(&self, token: &Address) -> u8 {
        match self.metadata.get(token).await {
            Some(meta) => meta.decimals,
            None => {
                debug!(token = %token, "no cached decimals, assuming 18");
                DEFAULT_TOKEN_DECIMALS
            }
        }
    }

    fn parse_amount(&self, amount: &str, decimals: u8) -> OperationResult<U256> {
        let raw = parse_units(amount, decimals)?;
        if raw.is_zero() {
            return Err(OperationError::ZeroAmount);
        }
        Ok(raw)
    }

    async fn send(&self, from: Address, to: Address, data: String) -> OperationResult<String> {
        let tx = TransactionRequest {
            from,
            to,
            data,
            value: U256::zero(),
        };
        Ok(self.wallet.send_transaction(&tx).await?)
    }

    pub async fn wait_for_receipt(&self, hash: &str) -> OperationResult<()> {
        let deadline = Instant::now() + self.receipt_timeout;
        loop {
            match self.wallet.transaction_receipt(hash).await {
                Ok(Some(receipt)) if receipt.success => {
                    debug!(tx_hash = %hash, block = ?receipt.block_number, "transaction mined");
                    return Ok(());
                }
                Ok(Some(_)) => return Err(OperationError::Reverted(hash.to_string())),
                Ok(None) => {}
                Err(err) => warn!(tx_hash = %hash, error = %err, "receipt lookup failed"),
            }
            if Instant::now() >= deadline {
                return Err(OperationError::ReceiptTimeout(hash.to_string()));
            }
            sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}
