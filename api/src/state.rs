use std::sync::Arc;

use crate::{
    config::AppConfig,
    services::{BalanceSyncEngine, SessionService, VaultOperations},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub engine: Arc<BalanceSyncEngine>,
    pub sessions: Arc<SessionService>,
    pub operations: Arc<VaultOperations>,
}

#[allow(dead_code)]
fn _assert_state_bounds() {
    fn assert_bounds<T: Clone + Send + Sync + 'static>() {}
    assert_bounds::<AppState>();
}
