//! Bounded retry for role/client lookups.
//!
//! ERROR HANDLING
//! ==============
//! Only transient failures (transport, 408/429, 5xx) are retried. Back-off is
//! linear in the attempt number with a little random jitter so that several
//! gates re-resolving after an outage do not hit the platform in lockstep.
//! When the attempts run out the last error is returned; the gate then denies
//! elevated access and marks the snapshot degraded.

#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::provider::LookupError;

pub const DEFAULT_LOOKUP_RETRIES: usize = 3;
pub const DEFAULT_LOOKUP_RETRY_BASE_MS: u64 = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookupRetryPolicy {
    /// Total attempts, including the first. Values below 1 behave as 1.
    pub attempts: usize,
    /// Base delay multiplied by the attempt number between tries.
    pub base_delay: Duration,
}

impl Default for LookupRetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_LOOKUP_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_LOOKUP_RETRY_BASE_MS),
        }
    }
}

impl LookupRetryPolicy {
    /// Single attempt, no waiting.
    #[must_use]
    pub fn none() -> Self {
        Self { attempts: 1, base_delay: Duration::ZERO }
    }

    /// Delay after failed `attempt` (1-based): `attempt * base` plus up to `base / 2` jitter.
    #[must_use]
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let linear = base_ms.saturating_mul(attempt as u64);
        let jitter = if base_ms >= 2 { rand::rng().random_range(0..=base_ms / 2) } else { 0 };
        Duration::from_millis(linear.saturating_add(jitter))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, what: &'static str, mut op: F) -> Result<T, LookupError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LookupError>>,
    {
        let total = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < total => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        error = %e,
                        lookup = what,
                        attempt,
                        total,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "lookup failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
