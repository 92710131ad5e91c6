use rand::Rng;
use serde::Deserialize;
use std::thread;
use std::time::Duration;
use tracing::warn;

use crate::error::ApiError;

/// Longest server-requested wait that is still honored within a run.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(120);

/// Bounded retry with exponential backoff and jitter for remote calls.
///
/// Only errors classified as transient ([`ApiError::is_transient`]) are
/// retried. The delay before retry `n` (0-based) is
/// `initial_backoff_ms * 2^n`, capped at `max_backoff_ms`, plus up to 50%
/// random jitter. A `Retry-After` hint from the remote side raises the delay
/// to at least that value; a hint longer than [`MAX_RETRY_AFTER`] ends the
/// retries with the rate-limit error instead of stalling the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

impl RetryPolicy {
    /// Same number of attempts, no waiting in between.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    /// Base delay (without jitter) before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    fn jittered(&self, base: Duration) -> Duration {
        let base_ms = base.as_millis() as u64;
        let jitter = rand::thread_rng().gen_range(0..=base_ms / 2);
        Duration::from_millis(base_ms + jitter)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `what` labels the call in retry logs. The last error is returned as-is.
    pub fn run<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let mut delay = self.jittered(self.backoff(attempt - 1));
                    if let Some(min) = e.retry_after() {
                        if min > MAX_RETRY_AFTER {
                            warn!(
                                op = what,
                                attempt,
                                retry_after_s = min.as_secs(),
                                "retry hint too long, giving up"
                            );
                            return Err(e);
                        }
                        delay = delay.max(min);
                    }
                    warn!(
                        op = what,
                        attempt,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
