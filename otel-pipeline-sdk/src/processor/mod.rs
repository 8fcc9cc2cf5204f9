//! Processors sit between record producers and an [`Exporter`].
//!
//! ```ascii
//!   +-----------------+   +--------------------+   +---------------+
//!   | Provider.emit() +---> (Batch)Processor   +---> (Otlp)Exporter|
//!   +-----------------+   +--------------------+   +---------------+
//! ```
//!
//! [`Exporter`]: crate::export::Exporter
mod batch;
mod config;
mod simple;

pub use batch::{BatchProcessor, BatchProcessorBuilder};
pub use config::{BatchConfig, BatchConfigBuilder, QueueFullPolicy};
pub use simple::SimpleProcessor;

use crate::error::SdkResult;
use crate::record::Record;
use std::fmt::Debug;
use std::time::Duration;

/// Default timeout of the untimed `force_flush` and `shutdown` calls.
pub(crate) const DEFAULT_PROCESSOR_TIMEOUT: Duration = Duration::from_secs(5);

/// Receives finished records from producer threads.
///
/// Implementations must never panic into the caller of [`on_end`] and must
/// never block it on network I/O.
///
/// [`on_end`]: Processor::on_end
pub trait Processor: Send + Sync + Debug {
    /// Hand a finished record to the processor. Ownership moves here.
    fn on_end(&self, record: Record);

    /// Export everything queued so far, waiting at most `timeout`.
    ///
    /// A timeout unblocks the caller only; queued records keep draining.
    fn force_flush_with_timeout(&self, timeout: Duration) -> SdkResult;

    /// Export everything queued so far with the processor's default timeout.
    fn force_flush(&self) -> SdkResult {
        self.force_flush_with_timeout(DEFAULT_PROCESSOR_TIMEOUT)
    }

    /// Flush, stop accepting records and shut the exporter down.
    ///
    /// A second call is a no-op that logs a warning and returns `Ok`.
    fn shutdown_with_timeout(&self, timeout: Duration) -> SdkResult;

    /// Shut down with the processor's default timeout.
    fn shutdown(&self) -> SdkResult {
        self.shutdown_with_timeout(DEFAULT_PROCESSOR_TIMEOUT)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::common::KeyValue;
    use crate::record::{LogRecord, Record};
    use crate::resource::{InstrumentationScope, Resource};
    use std::sync::Arc;

    /// A log record whose `seq` attribute identifies it.
    pub(crate) fn numbered_record(seq: i64) -> Record {
        LogRecord::builder()
            .with_body("test")
            .with_attributes([KeyValue::new("seq", seq)])
            .build(
                Arc::new(Resource::empty()),
                InstrumentationScope::builder("processor-test").build_shared(),
            )
            .into()
    }

    /// The `seq` attribute of records built by [`numbered_record`].
    pub(crate) fn seq_of(record: &Record) -> i64 {
        match record {
            Record::Log(log) => match log.attributes.first().map(|kv| &kv.value) {
                Some(crate::common::Value::I64(seq)) => *seq,
                _ => -1,
            },
            _ => -1,
        }
    }

    /// Level and name of every diagnostic emitted on this thread while `f` runs.
    #[cfg(feature = "internal-logs")]
    pub(crate) fn captured_diagnostics(f: impl FnOnce()) -> Vec<(tracing::Level, String)> {
        use std::sync::Mutex;
        use tracing_subscriber::layer::{Context, SubscriberExt};
        use tracing_subscriber::Layer;

        #[derive(Clone, Default)]
        struct Capture(Arc<Mutex<Vec<(tracing::Level, String)>>>);

        impl<S: tracing::Subscriber> Layer<S> for Capture {
            fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
                let metadata = event.metadata();
                self.0
                    .lock()
                    .unwrap()
                    .push((*metadata.level(), metadata.name().to_string()));
            }
        }

        let capture = Capture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        tracing::subscriber::with_default(subscriber, f);
        let captured = capture.0.lock().unwrap().clone();
        captured
    }
}
