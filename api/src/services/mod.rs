pub mod balances;
pub mod fallback;
pub mod metadata;
pub mod operations;
pub mod session;

pub use balances::{BalanceSyncEngine, EngineSettings, Holder, SyncError};
pub use fallback::{first_success, with_timeout, Attempt, Strategy};
pub use metadata::MetadataCache;
pub use operations::{OperationError, OperationResult, VaultOperations};
pub use session::SessionService;
