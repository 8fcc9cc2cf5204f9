//! Exponential backoff with jitter around a [`TransportClient`].
//!
//! Failures are retried according to their [`RetryErrorType`]:
//!
//! * `Retryable`: wait `initial_delay * 2^attempt`, capped at `max_delay`,
//!   plus up to `jitter_ratio` of that delay.
//! * `Throttled(hint)`: wait what the server asked for, but never less than
//!   `initial_delay`, so that a zero or past `Retry-After` cannot spin.
//! * `NonRetryable`: give up at once.
//!
//! The loop also gives up once the attempt limit is reached or the next wait
//! would push the total time past `max_elapsed_time`. Every attempt runs with
//! telemetry suppressed so that the transport's own instrumentation does not
//! feed back into the pipeline.
use crate::transport::{ExportRequest, ExportResponse, TransportClient, TransportError};
use otel_pipeline_sdk::{otel_debug, otel_warn, Context};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fmt::Debug;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How a failed attempt should be handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Transient; retry with exponential backoff.
    Retryable,
    /// Permanent; do not retry.
    NonRetryable,
    /// Retry after the server-provided delay.
    Throttled(Duration),
}

/// Limits for the retry loop.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    initial_delay: Duration,
    max_delay: Duration,
    max_elapsed_time: Duration,
    max_attempts: Option<u32>,
    jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_elapsed_time: Duration::from_secs(900),
            max_attempts: None,
            jitter_ratio: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Delay before the first retry. Default 500 ms.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Upper bound for a single computed delay. Default 30 s.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Total time budget for one request, waits included. Default 900 s.
    pub fn with_max_elapsed_time(mut self, elapsed: Duration) -> Self {
        self.max_elapsed_time = elapsed;
        self
    }

    /// Maximum number of attempts, the first one included. Unlimited by default.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    /// Fraction of the delay added as random jitter, clamped to `[0, 1]`. Default 0.2.
    pub fn with_jitter_ratio(mut self, ratio: f64) -> Self {
        self.jitter_ratio = if ratio.is_nan() {
            0.0
        } else {
            ratio.clamp(0.0, 1.0)
        };
        self
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        RetryPolicy::default().with_max_attempts(1)
    }
}

/// Computes backoff delays for a [`RetryPolicy`].
#[derive(Debug)]
pub struct Backoff {
    policy: RetryPolicy,
    rng: SmallRng,
}

impl Backoff {
    /// Backoff for `policy`, with a freshly seeded jitter source.
    pub fn new(policy: RetryPolicy) -> Self {
        Backoff {
            policy,
            rng: SmallRng::from_os_rng(),
        }
    }

    /// The delay after failed attempt number `attempt` (0-based), without jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.policy
            .initial_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
            .min(self.policy.max_delay)
    }

    /// [`delay_for`](Self::delay_for) plus jitter, still capped at `max_delay`.
    ///
    /// Consecutive values never decrease: doubling dominates a jitter of at
    /// most 100%.
    pub fn next_delay(&mut self, attempt: u32) -> Duration {
        let base = self.delay_for(attempt);
        let jitter = if self.policy.jitter_ratio > 0.0 {
            base.mul_f64(self.rng.random_range(0.0..=self.policy.jitter_ratio))
        } else {
            Duration::ZERO
        };
        base.saturating_add(jitter).min(self.policy.max_delay)
    }
}

/// Blocks the retry loop between attempts.
pub trait Sleeper: Send + Sync + Debug {
    /// Wait for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

/// A [`TransportClient`] that retries the failures of another one.
#[derive(Debug)]
pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
    backoff: Mutex<Backoff>,
    sleeper: Box<dyn Sleeper>,
}

impl<C: TransportClient> RetryingClient<C> {
    /// Wrap `inner`, retrying according to `policy`.
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        RetryingClient {
            inner,
            backoff: Mutex::new(Backoff::new(policy.clone())),
            policy,
            sleeper: Box::new(ThreadSleeper),
        }
    }

    /// Replace the thread sleeper, e.g. to observe delays in tests.
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        match self.backoff.lock() {
            Ok(mut backoff) => backoff.next_delay(attempt),
            Err(poisoned) => poisoned.into_inner().next_delay(attempt),
        }
    }
}

impl<C: TransportClient> TransportClient for RetryingClient<C> {
    fn send(&self, request: &ExportRequest) -> Result<ExportResponse, TransportError> {
        let started = Instant::now();
        let mut slept = Duration::ZERO;
        let mut attempts: u32 = 0;

        loop {
            let result = {
                let _suppressed = Context::enter_telemetry_suppressed_scope();
                self.inner.send(request)
            };
            attempts += 1;
            let error = match result {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            let delay = match error.kind {
                RetryErrorType::NonRetryable => return Err(error),
                RetryErrorType::Throttled(hint) => hint.max(self.policy.initial_delay),
                RetryErrorType::Retryable => self.backoff_delay(attempts - 1),
            };

            if self.policy.max_attempts.is_some_and(|max| attempts >= max) {
                otel_warn!(
                    name: "Transport.RetriesExhausted",
                    signal = request.signal.as_str(),
                    attempts = attempts,
                    error = error.message.as_str()
                );
                return Err(error);
            }
            // A fake sleeper returns at once, so the budget also counts requested waits.
            let elapsed = started.elapsed().max(slept);
            if elapsed.saturating_add(delay) > self.policy.max_elapsed_time {
                otel_warn!(
                    name: "Transport.RetryBudgetExhausted",
                    signal = request.signal.as_str(),
                    attempts = attempts,
                    error = error.message.as_str()
                );
                return Err(error);
            }

            otel_debug!(
                name: "Transport.Retrying",
                signal = request.signal.as_str(),
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = error.message.as_str()
            );
            self.sleeper.sleep(delay);
            slept = slept.saturating_add(delay);
        }
    }

    fn shutdown(&self) {
        self.inner.shutdown()
    }
}
