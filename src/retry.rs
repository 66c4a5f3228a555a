//! Round-based retry policy shared by every delivery strategy.
//!
//! A policy is a declarative list of delays. Round `n` starts at the
//! cumulative offset of the first `n` delays, measured from the start of the
//! first round, so the schedule does not drift when a round runs long.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

/// A successful run, with the round count it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    pub rounds: usize,
}

/// Every round failed. Errors are in round order.
#[derive(Debug)]
pub struct RetryError<E> {
    pub errors: Vec<E>,
}

impl<E> RetryError<E> {
    pub fn rounds(&self) -> usize {
        self.errors.len()
    }

    pub fn last(&self) -> Option<&E> {
        self.errors.last()
    }
}

impl RetryPolicy {
    /// A single attempt with no retries.
    pub fn once() -> Self {
        Self::default()
    }

    pub fn with_delays<I>(delays: I) -> Self
    where
        I: IntoIterator<Item = Duration>,
    {
        Self {
            delays: delays.into_iter().collect(),
        }
    }

    pub fn from_millis(delays_ms: &[u64]) -> Self {
        Self::with_delays(delays_ms.iter().copied().map(Duration::from_millis))
    }

    pub fn max_rounds(&self) -> usize {
        self.delays.len() + 1
    }

    /// Start offset of every round relative to the first one.
    pub fn offsets(&self) -> Vec<Duration> {
        let mut offsets = Vec::with_capacity(self.max_rounds());
        let mut total = Duration::ZERO;
        offsets.push(total);
        for delay in &self.delays {
            total += *delay;
            offsets.push(total);
        }
        offsets
    }

    /// Runs `op` until it succeeds or the rounds are exhausted.
    ///
    /// `op` receives the zero-based round number.
    pub async fn run<F, Fut, T, E>(&self, label: &str, mut op: F) -> Result<Retried<T>, RetryError<E>>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start = Instant::now();
        let mut errors = Vec::new();

        for (round, offset) in self.offsets().into_iter().enumerate() {
            sleep_until(start + offset).await;
            debug!(label, round, max = self.max_rounds(), "retry: starting round");

            match op(round).await {
                Ok(value) => {
                    if round > 0 {
                        debug!(label, round, "retry: succeeded after retries");
                    }
                    return Ok(Retried {
                        value,
                        rounds: round + 1,
                    });
                }
                Err(e) => {
                    warn!(label, round, max = self.max_rounds(), error = %e, "retry: round failed");
                    errors.push(e);
                }
            }
        }

        Err(RetryError { errors })
    }
}
