use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use abi_codec::{decode_uint256, encode_call, Method, Param};
use chrono::Utc;
use domain::{
    Address, BalanceRecord, SessionState, SyncSnapshot, SyncStatus, TokenMetadata,
    DEFAULT_TOKEN_DECIMALS,
};
use ethers::types::U256;
use futures::future::join_all;
use metrics::{counter, gauge};
use thiserror::Error;
use tokio::{
    sync::{watch, Mutex, MutexGuard, RwLock},
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, info, warn};
use transport::{ChainError, ChainResult, Transport};

use crate::services::{
    fallback::{first_success, with_timeout, Strategy},
    metadata::MetadataCache,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("wallet not connected")]
    NotConnected,
    #[error("detecting network")]
    DetectingNetwork,
    #[error("wrong network: connected to chain {actual}, expected {expected}")]
    WrongNetwork { expected: u64, actual: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Holder {
    Vault,
    Wallet,
}

impl Holder {
    pub fn label(self) -> &'static str {
        match self {
            Holder::Vault => "vault",
            Holder::Wallet => "wallet",
        }
    }
}

#[derive(Clone, Debug)]
pub struct EngineSettings {
    pub vault: Address,
    pub expected_chain_id: u64,
    pub native_symbol: String,
    pub call_timeout: Duration,
    pub poll_interval: Duration,
}

#[derive(Clone, Debug, Default)]
struct SyncInputs {
    session: SessionState,
    watched: Vec<Address>,
}

/// Last known-good amounts, only touched under the cycle lock.
#[derive(Debug, Default)]
struct CycleState {
    holder: Option<Address>,
    last_native: Option<U256>,
    last_tokens: HashMap<Address, U256>,
}

struct View {
    holder: Holder,
    snapshots: watch::Sender<Arc<SyncSnapshot>>,
    cycle: Mutex<CycleState>,
    fetching: AtomicBool,
    completed: AtomicU64,
}

impl View {
    fn new(holder: Holder, live_updates: bool) -> Self {
        let initial = SyncSnapshot {
            live_updates,
            ..SyncSnapshot::default()
        };
        let (snapshots, _) = watch::channel(Arc::new(initial));
        Self {
            holder,
            snapshots,
            cycle: Mutex::new(CycleState::default()),
            fetching: AtomicBool::new(false),
            completed: AtomicU64::new(0),
        }
    }
}

// ⚠️ 被取消的 cycle 也要清掉 fetching 旗標
struct InFlight<'a> {
    view: &'a View,
}

impl<'a> InFlight<'a> {
    fn start(view: &'a View) -> Self {
        view.fetching.store(true, Ordering::SeqCst);
        gauge!("vault_sync_cycles_in_flight", "view" => view.holder.label()).increment(1.0);
        Self { view }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.view.fetching.store(false, Ordering::SeqCst);
        gauge!("vault_sync_cycles_in_flight", "view" => self.view.holder.label()).decrement(1.0);
    }
}

pub struct BalanceSyncEngine {
    transport: Arc<dyn Transport>,
    metadata: Arc<MetadataCache>,
    settings: EngineSettings,
    inputs: RwLock<SyncInputs>,
    live: AtomicBool,
    vault: View,
    wallet: View,
}

impl BalanceSyncEngine {
    pub fn new(
        transport: Arc<dyn Transport>,
        metadata: Arc<MetadataCache>,
        settings: EngineSettings,
        live_updates: bool,
    ) -> Self {
        Self {
            transport,
            metadata,
            settings,
            inputs: RwLock::new(SyncInputs::default()),
            live: AtomicBool::new(live_updates),
            vault: View::new(Holder::Vault, live_updates),
            wallet: View::new(Holder::Wallet, live_updates),
        }
    }

    fn view(&self, holder: Holder) -> &View {
        match holder {
            Holder::Vault => &self.vault,
            Holder::Wallet => &self.wallet,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn metadata(&self) -> &Arc<MetadataCache> {
        &self.metadata
    }

    pub fn snapshot(&self) -> Arc<SyncSnapshot> {
        self.snapshot_of(Holder::Vault)
    }

    pub fn snapshot_of(&self, holder: Holder) -> Arc<SyncSnapshot> {
        self.view(holder).snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<SyncSnapshot>> {
        self.subscribe_to(Holder::Vault)
    }

    pub fn subscribe_to(&self, holder: Holder) -> watch::Receiver<Arc<SyncSnapshot>> {
        self.view(holder).snapshots.subscribe()
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn is_fetching(&self) -> bool {
        self.is_fetching_for(Holder::Vault)
    }

    pub fn is_fetching_for(&self, holder: Holder) -> bool {
        self.view(holder).fetching.load(Ordering::SeqCst)
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed_for(Holder::Vault)
    }

    pub fn cycles_completed_for(&self, holder: Holder) -> u64 {
        self.view(holder).completed.load(Ordering::SeqCst)
    }

    pub async fn session(&self) -> SessionState {
        self.inputs.read().await.session
    }

    pub async fn set_session(&self, session: SessionState) {
        info!(account = ?session.account, chain_id = ?session.chain_id, "session updated");
        self.inputs.write().await.session = session;
    }

    pub async fn watched_tokens(&self) -> Vec<Address> {
        self.inputs.read().await.watched.clone()
    }

    pub async fn set_watched_tokens(&self, tokens: Vec<Address>) -> Vec<Address> {
        let mut unique: Vec<Address> = Vec::with_capacity(tokens.len());
        for token in tokens {
            if !unique.contains(&token) {
                unique.push(token);
            }
        }
        info!(count = unique.len(), "watched tokens updated");
        self.inputs.write().await.watched = unique.clone();
        unique
    }

    pub fn pause(&self) {
        self.set_live(false);
    }

    pub fn resume(&self) {
        self.set_live(true);
    }

    fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::SeqCst);
        for view in [&self.vault, &self.wallet] {
            view.snapshots.send_modify(|current| {
                if current.live_updates != live {
                    Arc::make_mut(current).live_updates = live;
                }
            });
        }
        info!(live, "live updates toggled");
    }

    pub async fn refresh(&self) -> Arc<SyncSnapshot> {
        self.refresh_for(Holder::Vault).await
    }

    pub async fn refresh_for(&self, holder: Holder) -> Arc<SyncSnapshot> {
        let mut guard = self.view(holder).cycle.lock().await;
        self.run_cycle(holder, &mut guard, "manual").await
    }

    pub async fn poll_tick(&self) -> Option<Arc<SyncSnapshot>> {
        self.poll_tick_for(Holder::Vault).await
    }

    pub async fn poll_tick_for(&self, holder: Holder) -> Option<Arc<SyncSnapshot>> {
        if !self.is_live() {
            debug!(view = holder.label(), "poll tick skipped: paused");
            return None;
        }
        let Ok(mut guard) = self.view(holder).cycle.try_lock() else {
            debug!(view = holder.label(), "poll tick skipped: cycle in flight");
            return None;
        };
        Some(self.run_cycle(holder, &mut guard, "poll").await)
    }

    pub fn spawn_poller(self: Arc<Self>) -> JoinHandle<()> {
        let interval = self.settings.poll_interval;
        tokio::spawn(async move {
            loop {
                tokio::join!(
                    self.poll_tick_for(Holder::Vault),
                    self.poll_tick_for(Holder::Wallet)
                );
                sleep(interval).await;
            }
        })
    }

    fn check_preconditions(&self, session: &SessionState) -> Result<Address, SyncError> {
        let Some(account) = session.account else {
            return Err(SyncError::NotConnected);
        };
        match session.chain_id {
            None => Err(SyncError::DetectingNetwork),
            Some(actual) if actual != self.settings.expected_chain_id => {
                Err(SyncError::WrongNetwork {
                    expected: self.settings.expected_chain_id,
                    actual,
                })
            }
            Some(_) => Ok(account),
        }
    }

    async fn run_cycle(
        &self,
        holder: Holder,
        state: &mut MutexGuard<'_, CycleState>,
        trigger: &'static str,
    ) -> Arc<SyncSnapshot> {
        let view = self.view(holder);
        let _in_flight = InFlight::start(view);
        let inputs = self.inputs.read().await.clone();
        let previous = view.snapshots.borrow().clone();
        let sequence = previous.sequence + 1;

        let account = match self.check_preconditions(&inputs.session) {
            Ok(account) => account,
            Err(err) => {
                warn!(error = %err, view = holder.label(), trigger, sequence, "sync cycle skipped");
                let mut next = (*previous).clone();
                next.sequence = sequence;
                next.status = SyncStatus::CycleFailure;
                next.error = Some(err.to_string());
                return self.publish(view, next);
            }
        };

        let owner = match holder {
            Holder::Vault => self.settings.vault,
            Holder::Wallet => account,
        };
        // amounts belong to one address; a new account starts over
        if state.holder != Some(owner) {
            **state = CycleState {
                holder: Some(owner),
                ..CycleState::default()
            };
        }
        state
            .last_tokens
            .retain(|token, _| inputs.watched.contains(token));
        let last_native = state.last_native;
        let token_work = inputs.watched.iter().map(|token| {
            let last = state.last_tokens.get(token).copied();
            self.sync_token(holder, owner, *token, last)
        });
        let ((native, fresh_native), tokens) = tokio::join!(
            self.sync_native(holder, owner, last_native),
            join_all(token_work)
        );

        if fresh_native.is_some() {
            state.last_native = fresh_native;
        }
        let mut records = Vec::with_capacity(tokens.len());
        for (record, fresh) in tokens {
            if let Some(amount) = fresh {
                state.last_tokens.insert(record.address, amount);
            }
            records.push(record);
        }

        let mut failed = 0;
        for record in records.iter().chain(std::iter::once(&native)) {
            if record.error.is_some() {
                failed += 1;
                counter!("vault_sync_asset_failures_total", "view" => holder.label()).increment(1);
            }
            if record.used_fallback {
                counter!("vault_sync_fallbacks_total", "view" => holder.label()).increment(1);
            }
        }
        let status = if failed == 0 {
            SyncStatus::Success
        } else {
            SyncStatus::PartialFailure
        };
        info!(
            view = holder.label(),
            trigger,
            sequence,
            tokens = records.len(),
            failed,
            native_fallback = native.used_fallback,
            "sync cycle finished"
        );

        self.publish(
            view,
            SyncSnapshot {
                sequence,
                status,
                native: Some(native),
                tokens: records,
                updated_at: Some(Utc::now()),
                error: None,
                live_updates: self.is_live(),
            },
        )
    }

    fn publish(&self, view: &View, mut snapshot: SyncSnapshot) -> Arc<SyncSnapshot> {
        let mut published = Arc::new(SyncSnapshot::default());
        view.snapshots.send_modify(|current| {
            snapshot.live_updates = self.is_live();
            published = Arc::new(snapshot.clone());
            *current = published.clone();
        });
        view.completed.fetch_add(1, Ordering::SeqCst);
        counter!(
            "vault_sync_cycles_total",
            "view" => view.holder.label(),
            "status" => status_label(published.status)
        )
        .increment(1);
        published
    }

    async fn sync_native(
        &self,
        holder: Holder,
        owner: Address,
        last: Option<U256>,
    ) -> (BalanceRecord, Option<U256>) {
        let strategies = match holder {
            Holder::Vault => vec![
                Strategy::new("vault.bnbBalance", self.vault_native_balance()),
                Strategy::new("eth_getBalance", self.chain_native_balance(owner)),
            ],
            Holder::Wallet => vec![Strategy::new(
                "eth_getBalance",
                self.chain_native_balance(owner),
            )],
        };
        let attempt = first_success(strategies).await;
        let template = TokenMetadata {
            symbol: self.settings.native_symbol.clone(),
            decimals: DEFAULT_TOKEN_DECIMALS,
        };
        settle(owner, template, attempt.into_result(), last)
    }

    async fn vault_native_balance(&self) -> ChainResult<U256> {
        let data = encode_call(Method::NativeBalance, &[])?;
        let reply = with_timeout(
            self.settings.call_timeout,
            "bnbBalance",
            self.transport.call(&self.settings.vault, &data),
        )
        .await?;
        Ok(decode_uint256(&reply)?)
    }

    async fn chain_native_balance(&self, owner: Address) -> ChainResult<U256> {
        with_timeout(
            self.settings.call_timeout,
            "eth_getBalance",
            self.transport.native_balance(&owner),
        )
        .await
    }

    async fn sync_token(
        &self,
        holder: Holder,
        owner: Address,
        token: Address,
        last: Option<U256>,
    ) -> (BalanceRecord, Option<U256>) {
        let strategies = match holder {
            Holder::Vault => vec![
                Strategy::new("vault.tokenBalance", self.vault_token_balance(token)),
                Strategy::new("token.balanceOf", self.token_balance_of(token, owner)),
            ],
            Holder::Wallet => vec![Strategy::new(
                "token.balanceOf",
                self.token_balance_of(token, owner),
            )],
        };
        let (metadata, attempt) = tokio::join!(
            self.metadata.resolve(
                self.transport.as_ref(),
                &token,
                self.settings.call_timeout
            ),
            first_success(strategies),
        );
        let result = attempt.into_result();
        if let Err(err) = &result {
            warn!(view = holder.label(), token = %token, error = %err, "token balance unavailable");
        }
        settle(token, metadata, result, last)
    }

    async fn vault_token_balance(&self, token: Address) -> ChainResult<U256> {
        let data = encode_call(Method::TokenBalance, &[Param::Address(token)])?;
        let reply = with_timeout(
            self.settings.call_timeout,
            "tokenBalance",
            self.transport.call(&self.settings.vault, &data),
        )
        .await?;
        Ok(decode_uint256(&reply)?)
    }

    async fn token_balance_of(&self, token: Address, owner: Address) -> ChainResult<U256> {
        let data = encode_call(Method::BalanceOf, &[Param::Address(owner)])?;
        let reply = with_timeout(
            self.settings.call_timeout,
            "balanceOf",
            self.transport.call(&token, &data),
        )
        .await?;
        Ok(decode_uint256(&reply)?)
    }
}

fn status_label(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Pending => "pending",
        SyncStatus::Success => "success",
        SyncStatus::PartialFailure => "partial_failure",
        SyncStatus::CycleFailure => "cycle_failure",
    }
}

/// Builds the record for one asset. A failed read keeps the last known-good
/// amount marked stale, or zero when there never was one.
fn settle(
    address: Address,
    metadata: TokenMetadata,
    result: Result<(U256, bool), ChainError>,
    last: Option<U256>,
) -> (BalanceRecord, Option<U256>) {
    match result {
        Ok((amount, used_fallback)) => (
            BalanceRecord {
                address,
                raw_amount: amount,
                symbol: metadata.symbol,
                decimals: metadata.decimals,
                error: None,
                used_fallback,
                stale: false,
            },
            Some(amount),
        ),
        Err(err) => {
            let message = err.to_string();
            let message = if message.is_empty() {
                "Failed to fetch balance".to_string()
            } else {
                message
            };
            (
                BalanceRecord {
                    address,
                    raw_amount: last.unwrap_or_default(),
                    symbol: metadata.symbol,
                    decimals: metadata.decimals,
                    error: Some(message),
                    used_fallback: false,
                    stale: last.is_some(),
                },
                None,
            )
        }
    }
}
