//! Startup connection retry.
//!
//! The gateway connects exactly once, before serving, with exponential
//! backoff bounded by a total time budget. Statement execution afterwards is
//! never retried.

use std::time::Duration;

use tokio::time::{self, Instant};

use super::{BackendError, Database};
use crate::config::DatabaseConfig;

/// Exponential backoff bounded by a total budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub budget: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            initial_backoff: Duration::from_millis(config.connect_initial_backoff_ms),
            max_backoff: Duration::from_secs(5),
            budget: Duration::from_secs(config.connect_retry_budget_secs),
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&DatabaseConfig::default())
    }
}

/// Ping `db` until it answers or the budget is spent.
///
/// Returns the number of attempts made on success, or the last error once
/// the next backoff would overrun the budget.
pub async fn connect_with_retry(db: &dyn Database, policy: &RetryPolicy) -> Result<u32, BackendError> {
    let deadline = Instant::now() + policy.budget;
    let mut attempt = 0u32;
    loop {
        tracing::info!(attempt = attempt + 1, "connecting to database");
        match db.ping().await {
            Ok(()) => {
                tracing::info!(attempts = attempt + 1, "database connection established");
                return Ok(attempt + 1);
            }
            Err(e) => {
                let delay = policy.backoff(attempt);
                if Instant::now() + delay > deadline {
                    tracing::error!(error = %e, attempts = attempt + 1, "giving up on database connection");
                    return Err(e);
                }
                tracing::warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "database not reachable");
                time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
