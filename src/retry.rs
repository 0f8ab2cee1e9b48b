//! Retry wrapper (§4.2): a bounded loop with fixed backoff, cancellation-aware.
//!
//! The teacher retries patch conflicts with `backoff::ExponentialBackoff`;
//! cluster reads here only need a flat retry interval, so this implements
//! [`backoff::backoff::Backoff`] directly rather than configuring the
//! exponential policy down to a no-op multiplier.

use std::time::Duration;

use backoff::backoff::Backoff;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::ClusterError;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

struct FixedBackoff {
    interval: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl FixedBackoff {
    fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            attempt: 0,
        }
    }
}

impl Backoff for FixedBackoff {
    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            None
        } else {
            Some(self.interval)
        }
    }
}

/// Retries `op` up to `max_attempts` times with a fixed delay between tries,
/// on any failure (§4.2). A cancelled token aborts the wait between attempts
/// immediately, returning the last error.
pub async fn retry<F, Fut, T>(
    cancellation: &CancellationToken,
    mut op: F,
) -> Result<T, ClusterError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ClusterError>>,
{
    let mut backoff = FixedBackoff::new(DEFAULT_INTERVAL, DEFAULT_MAX_ATTEMPTS);
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => match backoff.next_backoff() {
                Some(delay) => {
                    warn!(%err, attempt = backoff.attempt, "cluster operation failed, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancellation.cancelled() => return Err(err),
                    }
                }
                None => return Err(err),
            },
        }
    }
}
