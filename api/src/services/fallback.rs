use std::{future::Future, time::Duration};

use futures::future::BoxFuture;
use tracing::{debug, warn};
use transport::{ChainError, ChainResult};

pub struct Strategy<'a, T> {
    pub name: &'static str,
    run: BoxFuture<'a, ChainResult<T>>,
}

impl<'a, T> Strategy<'a, T> {
    pub fn new(name: &'static str, run: impl Future<Output = ChainResult<T>> + Send + 'a) -> Self {
        Self {
            name,
            run: Box::pin(run),
        }
    }
}

#[derive(Debug)]
pub enum Attempt<T> {
    Primary(T),
    Fallback {
        value: T,
        strategy: &'static str,
        skipped: Vec<(&'static str, ChainError)>,
    },
    Failed(Vec<(&'static str, ChainError)>),
}

impl<T> Attempt<T> {
    pub fn used_fallback(&self) -> bool {
        matches!(self, Attempt::Fallback { .. })
    }

    pub fn into_result(self) -> Result<(T, bool), ChainError> {
        match self {
            Attempt::Primary(value) => Ok((value, false)),
            Attempt::Fallback { value, .. } => Ok((value, true)),
            Attempt::Failed(mut errors) => Err(errors
                .pop()
                .map(|(_, err)| err)
                .unwrap_or_else(|| ChainError::Network("no strategy configured".to_string()))),
        }
    }
}

pub async fn first_success<T>(strategies: Vec<Strategy<'_, T>>) -> Attempt<T> {
    let mut errors = Vec::new();
    for (index, strategy) in strategies.into_iter().enumerate() {
        match strategy.run.await {
            Ok(value) if index == 0 => return Attempt::Primary(value),
            Ok(value) => {
                debug!(strategy = strategy.name, "fallback strategy succeeded");
                return Attempt::Fallback {
                    value,
                    strategy: strategy.name,
                    skipped: errors,
                };
            }
            Err(err) => {
                warn!(strategy = strategy.name, error = %err, "strategy failed");
                errors.push((strategy.name, err));
            }
        }
    }
    Attempt::Failed(errors)
}

/// Bounds one read. The underlying request is not aborted, only abandoned.
pub async fn with_timeout<T>(
    limit: Duration,
    what: &str,
    fut: impl Future<Output = ChainResult<T>>,
) -> ChainResult<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ChainError::Timeout(format!(
            "{what} timed out after {}s",
            limit.as_secs_f64()
        ))),
    }
}
