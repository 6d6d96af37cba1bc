use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::{sleep, Instant};

use crate::PipelineError;

/// Bounded exponential backoff with jitter, decoupled from the operation it
/// wraps. The pipeline applies it to transcription calls only; extraction has
/// its own strategy fallback and is never retried.
#[derive(Clone)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub multiplier: u32,
    /// Total window measured from the first attempt; once a computed delay
    /// would extend past it, the last failure is surfaced unchanged.
    pub max_elapsed: Duration,
    pub jitter: fn(Duration) -> Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(200),
            multiplier: 2,
            max_elapsed: Duration::from_secs(10),
            jitter: clock_jitter,
        }
    }
}

/// Scale a delay by a factor in [0.5, 1.5) derived from the system clock's
/// subsecond nanos. Spreads simultaneous clients apart without pulling in an
/// RNG dependency.
pub fn clock_jitter(delay: Duration) -> Duration {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let factor = 0.5 + f64::from(nanos) / 1_000_000_000.0;
    delay.mul_f64(factor)
}

impl RetryPolicy {
    /// Run `op` until it succeeds or the retry window closes. Attempts are
    /// equivalent and stateless; only the final outcome crosses the boundary,
    /// and the attempt count is never exposed.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let started = Instant::now();
        let mut delay = self.initial_delay;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let wait = (self.jitter)(delay);
                    if started.elapsed() + wait > self.max_elapsed {
                        tracing::warn!(
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "retry window exhausted, surfacing last failure"
                        );
                        return Err(err);
                    }
                    tracing::debug!(
                        delay_ms = wait.as_millis() as u64,
                        "attempt failed, backing off"
                    );
                    sleep(wait).await;
                    delay = delay.saturating_mul(self.multiplier);
                }
            }
        }
    }
}
