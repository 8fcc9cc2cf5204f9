use crate::record::Signal;
use std::cmp::{max, min};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Delay interval between two consecutive span exports.
pub(crate) const OTEL_BSP_SCHEDULE_DELAY: &str = "OTEL_BSP_SCHEDULE_DELAY";
/// Default delay interval between two consecutive span exports.
pub(crate) const OTEL_BSP_SCHEDULE_DELAY_DEFAULT: Duration = Duration::from_millis(5_000);
/// Maximum allowed time to export span data.
pub(crate) const OTEL_BSP_EXPORT_TIMEOUT: &str = "OTEL_BSP_EXPORT_TIMEOUT";
/// Maximum span queue size.
pub(crate) const OTEL_BSP_MAX_QUEUE_SIZE: &str = "OTEL_BSP_MAX_QUEUE_SIZE";
/// Maximum span batch size, must be less than or equal to OTEL_BSP_MAX_QUEUE_SIZE.
pub(crate) const OTEL_BSP_MAX_EXPORT_BATCH_SIZE: &str = "OTEL_BSP_MAX_EXPORT_BATCH_SIZE";

/// Delay interval between two consecutive log exports.
pub(crate) const OTEL_BLRP_SCHEDULE_DELAY: &str = "OTEL_BLRP_SCHEDULE_DELAY";
/// Default delay interval between two consecutive log exports.
pub(crate) const OTEL_BLRP_SCHEDULE_DELAY_DEFAULT: Duration = Duration::from_millis(1_000);
/// Maximum allowed time to export log data.
pub(crate) const OTEL_BLRP_EXPORT_TIMEOUT: &str = "OTEL_BLRP_EXPORT_TIMEOUT";
/// Maximum log queue size.
pub(crate) const OTEL_BLRP_MAX_QUEUE_SIZE: &str = "OTEL_BLRP_MAX_QUEUE_SIZE";
/// Maximum log batch size, must be less than or equal to OTEL_BLRP_MAX_QUEUE_SIZE.
pub(crate) const OTEL_BLRP_MAX_EXPORT_BATCH_SIZE: &str = "OTEL_BLRP_MAX_EXPORT_BATCH_SIZE";

/// Interval between two consecutive metric exports.
pub(crate) const OTEL_METRIC_EXPORT_INTERVAL: &str = "OTEL_METRIC_EXPORT_INTERVAL";
/// Default interval between two consecutive metric exports.
pub(crate) const OTEL_METRIC_EXPORT_INTERVAL_DEFAULT: Duration = Duration::from_millis(60_000);
/// Maximum allowed time to export metric data.
pub(crate) const OTEL_METRIC_EXPORT_TIMEOUT: &str = "OTEL_METRIC_EXPORT_TIMEOUT";

/// Default maximum allowed time to export data.
pub(crate) const EXPORT_TIMEOUT_DEFAULT: Duration = Duration::from_millis(30_000);
/// Default maximum queue size.
pub(crate) const MAX_QUEUE_SIZE_DEFAULT: usize = 2_048;
/// Default maximum batch size.
pub(crate) const MAX_EXPORT_BATCH_SIZE_DEFAULT: usize = 512;

/// What `on_end` does when the queue is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueueFullPolicy {
    /// Drop the record and count it. `on_end` never waits.
    #[default]
    DropAndCount,
    /// Wait for the worker to free a slot. Used by consumers that must not
    /// lose data; the wait is bounded by drain throughput, never by the
    /// network, and ends immediately once the processor is shut down.
    Block,
}

/// Batch processor configuration.
/// Use [`BatchConfigBuilder`] to configure your own instance of [`BatchConfig`].
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// The maximum queue size to buffer records for delayed processing.
    pub(crate) max_queue_size: usize,

    /// The delay between two consecutive processing of batches. `None`
    /// disables the timer: records are exported only when a full batch
    /// accumulates, on `force_flush`, or at shutdown.
    pub(crate) scheduled_delay: Option<Duration>,

    /// The maximum number of records to process in a single batch. Larger
    /// backlogs are exported as several batches back to back.
    pub(crate) max_export_batch_size: usize,

    /// Default timeout for `force_flush` and `shutdown`.
    pub(crate) max_export_timeout: Duration,

    /// Behaviour when the queue is full.
    pub(crate) queue_full_policy: QueueFullPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfigBuilder::default().build()
    }
}

impl BatchConfig {
    /// Queue capacity.
    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }

    /// Records per export call.
    pub fn max_export_batch_size(&self) -> usize {
        self.max_export_batch_size
    }

    /// Timer interval, `None` for manual export.
    pub fn scheduled_delay(&self) -> Option<Duration> {
        self.scheduled_delay
    }

    /// Default flush and shutdown timeout.
    pub fn max_export_timeout(&self) -> Duration {
        self.max_export_timeout
    }
}

/// A builder for creating [`BatchConfig`] instances.
#[derive(Debug)]
pub struct BatchConfigBuilder {
    max_queue_size: usize,
    scheduled_delay: Option<Duration>,
    max_export_batch_size: usize,
    max_export_timeout: Duration,
    queue_full_policy: QueueFullPolicy,
}

impl Default for BatchConfigBuilder {
    /// Defaults for spans, overridden by the `OTEL_BSP_*` environment variables.
    fn default() -> Self {
        BatchConfigBuilder::for_signal(Signal::Traces)
    }
}

impl BatchConfigBuilder {
    /// Defaults for `signal`, overridden by that signal's environment variables:
    ///
    /// * traces: `OTEL_BSP_MAX_QUEUE_SIZE`, `OTEL_BSP_MAX_EXPORT_BATCH_SIZE`,
    ///   `OTEL_BSP_SCHEDULE_DELAY`, `OTEL_BSP_EXPORT_TIMEOUT`
    /// * logs: the same with the `OTEL_BLRP_` prefix
    /// * metrics: `OTEL_METRIC_EXPORT_INTERVAL`, `OTEL_METRIC_EXPORT_TIMEOUT`
    ///
    /// Note: Programmatic configuration overrides any value set via the environment variable.
    pub fn for_signal(signal: Signal) -> Self {
        let scheduled_delay = match signal {
            Signal::Traces => OTEL_BSP_SCHEDULE_DELAY_DEFAULT,
            Signal::Logs => OTEL_BLRP_SCHEDULE_DELAY_DEFAULT,
            Signal::Metrics => OTEL_METRIC_EXPORT_INTERVAL_DEFAULT,
        };
        BatchConfigBuilder {
            max_queue_size: MAX_QUEUE_SIZE_DEFAULT,
            scheduled_delay: Some(scheduled_delay),
            max_export_batch_size: MAX_EXPORT_BATCH_SIZE_DEFAULT,
            max_export_timeout: EXPORT_TIMEOUT_DEFAULT,
            queue_full_policy: QueueFullPolicy::default(),
        }
        .init_from_env_vars(signal)
    }

    /// Set max_queue_size for [`BatchConfigBuilder`].
    /// It's the maximum queue size to buffer records for delayed processing.
    /// The default value is 2048.
    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    /// Set scheduled_delay for [`BatchConfigBuilder`].
    /// It's the delay interval between two consecutive processing of batches.
    /// A zero delay means manual export, as with [`with_manual_export`](Self::with_manual_export).
    pub fn with_scheduled_delay(mut self, scheduled_delay: Duration) -> Self {
        self.scheduled_delay = Some(scheduled_delay);
        self
    }

    /// Disable the export timer. Records are exported only on `force_flush`,
    /// at shutdown, or when a full batch has accumulated.
    pub fn with_manual_export(mut self) -> Self {
        self.scheduled_delay = None;
        self
    }

    /// Set max_export_timeout for [`BatchConfigBuilder`].
    /// It's the default time `force_flush` and `shutdown` wait for the worker.
    /// The default value is 30000 milliseconds.
    pub fn with_max_export_timeout(mut self, max_export_timeout: Duration) -> Self {
        self.max_export_timeout = max_export_timeout;
        self
    }

    /// Set max_export_batch_size for [`BatchConfigBuilder`].
    /// The default value is 512.
    pub fn with_max_export_batch_size(mut self, max_export_batch_size: usize) -> Self {
        self.max_export_batch_size = max_export_batch_size;
        self
    }

    /// Set what `on_end` does when the queue is full.
    pub fn with_queue_full_policy(mut self, policy: QueueFullPolicy) -> Self {
        self.queue_full_policy = policy;
        self
    }

    /// Builds a `BatchConfig` enforcing the following invariants:
    /// * `max_queue_size` is at least 1.
    /// * `max_export_batch_size` is at least 1 and at most `max_queue_size`.
    /// * a zero `scheduled_delay` disables the timer.
    pub fn build(self) -> BatchConfig {
        let max_queue_size = max(self.max_queue_size, 1);
        let max_export_batch_size = min(max(self.max_export_batch_size, 1), max_queue_size);

        BatchConfig {
            max_queue_size,
            scheduled_delay: self.scheduled_delay.filter(|delay| !delay.is_zero()),
            max_export_batch_size,
            max_export_timeout: self.max_export_timeout,
            queue_full_policy: self.queue_full_policy,
        }
    }

    fn init_from_env_vars(mut self, signal: Signal) -> Self {
        let (queue_var, batch_var, delay_var, timeout_var) = match signal {
            Signal::Traces => (
                Some(OTEL_BSP_MAX_QUEUE_SIZE),
                Some(OTEL_BSP_MAX_EXPORT_BATCH_SIZE),
                OTEL_BSP_SCHEDULE_DELAY,
                OTEL_BSP_EXPORT_TIMEOUT,
            ),
            Signal::Logs => (
                Some(OTEL_BLRP_MAX_QUEUE_SIZE),
                Some(OTEL_BLRP_MAX_EXPORT_BATCH_SIZE),
                OTEL_BLRP_SCHEDULE_DELAY,
                OTEL_BLRP_EXPORT_TIMEOUT,
            ),
            Signal::Metrics => (
                None,
                None,
                OTEL_METRIC_EXPORT_INTERVAL,
                OTEL_METRIC_EXPORT_TIMEOUT,
            ),
        };

        if let Some(max_queue_size) = queue_var.and_then(positive_from_env::<usize>) {
            self.max_queue_size = max_queue_size;
        }

        if let Some(max_export_batch_size) = batch_var.and_then(positive_from_env::<usize>) {
            self.max_export_batch_size = max_export_batch_size;
        }

        if let Some(scheduled_delay) = positive_from_env::<u64>(delay_var) {
            self.scheduled_delay = Some(Duration::from_millis(scheduled_delay));
        }

        if let Some(max_export_timeout) = positive_from_env::<u64>(timeout_var) {
            self.max_export_timeout = Duration::from_millis(max_export_timeout);
        }

        self
    }
}

/// Parse `var` as a positive number; zero and garbage are ignored.
fn positive_from_env<T>(var: &str) -> Option<T>
where
    T: FromStr + PartialOrd + Default,
{
    env::var(var)
        .ok()
        .and_then(|value| T::from_str(value.trim()).ok())
        .filter(|value| *value > T::default())
}
