//! The exporter contract and an in-memory exporter for tests.
use crate::error::{SdkError, SdkResult};
use crate::record::Record;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Encodes and transmits batches of records.
///
/// A processor calls every method from its single worker thread, so
/// implementations need no locking for that access pattern. `export` must
/// not panic on network failures; it reports them as `Err` once any retries
/// are exhausted.
///
/// After a successful `shutdown` every method short-circuits:
/// `export` returns [`SdkError::AlreadyShutdown`] and a second `shutdown`
/// logs a warning and returns `Ok`.
pub trait Exporter: Send + Sync + Debug {
    /// Export one batch. The batch is consumed whatever the outcome.
    fn export(&self, batch: Vec<Record>) -> SdkResult;

    /// Drain any internal buffering. Push exporters without their own queue
    /// have nothing to do here.
    fn force_flush(&self) -> SdkResult {
        Ok(())
    }

    /// Release the underlying connection.
    fn shutdown_with_timeout(&self, _timeout: Duration) -> SdkResult {
        Ok(())
    }

    /// Release the underlying connection with a default timeout.
    fn shutdown(&self) -> SdkResult {
        self.shutdown_with_timeout(Duration::from_secs(5))
    }
}

impl<T: Exporter + ?Sized> Exporter for Box<T> {
    fn export(&self, batch: Vec<Record>) -> SdkResult {
        (**self).export(batch)
    }

    fn force_flush(&self) -> SdkResult {
        (**self).force_flush()
    }

    fn shutdown_with_timeout(&self, timeout: Duration) -> SdkResult {
        (**self).shutdown_with_timeout(timeout)
    }
}

/// An exporter that keeps every exported record in memory.
///
/// Clones share storage, so a test can hand one clone to a processor and
/// inspect the other.
///
/// ```
/// use otel_pipeline_sdk::export::{Exporter, InMemoryExporter};
///
/// let exporter = InMemoryExporter::default();
/// exporter.export(Vec::new()).unwrap();
/// assert_eq!(exporter.batch_sizes(), vec![0]);
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryExporter {
    records: Arc<Mutex<Vec<Record>>>,
    batch_sizes: Arc<Mutex<Vec<usize>>>,
    shutdown_calls: Arc<AtomicUsize>,
    fail_exports: Arc<AtomicBool>,
    export_delay: Option<Duration>,
    should_reset_on_shutdown: bool,
}

impl Default for InMemoryExporter {
    fn default() -> Self {
        InMemoryExporterBuilder::new().build()
    }
}

/// Builder for [`InMemoryExporter`].
#[derive(Debug, Default)]
pub struct InMemoryExporterBuilder {
    export_delay: Option<Duration>,
    should_reset_on_shutdown: bool,
}

impl InMemoryExporterBuilder {
    /// A builder whose exporter keeps records after shutdown.
    pub fn new() -> Self {
        InMemoryExporterBuilder::default()
    }

    /// Sleep this long inside every `export`, to simulate a slow peer.
    pub fn with_export_delay(mut self, delay: Duration) -> Self {
        self.export_delay = Some(delay);
        self
    }

    /// Clear stored records when the exporter is shut down.
    pub fn reset_on_shutdown(mut self) -> Self {
        self.should_reset_on_shutdown = true;
        self
    }

    /// Build the exporter.
    pub fn build(self) -> InMemoryExporter {
        InMemoryExporter {
            records: Arc::new(Mutex::new(Vec::new())),
            batch_sizes: Arc::new(Mutex::new(Vec::new())),
            shutdown_calls: Arc::new(AtomicUsize::new(0)),
            fail_exports: Arc::new(AtomicBool::new(false)),
            export_delay: self.export_delay,
            should_reset_on_shutdown: self.should_reset_on_shutdown,
        }
    }
}

impl InMemoryExporter {
    /// Every record exported so far, in export order.
    pub fn get_finished_records(&self) -> Result<Vec<Record>, SdkError> {
        Ok(self.records.lock()?.clone())
    }

    /// Size of each batch received, in order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes
            .lock()
            .map(|sizes| sizes.clone())
            .unwrap_or_default()
    }

    /// How many times `shutdown` reached this exporter.
    pub fn shutdown_count(&self) -> usize {
        self.shutdown_calls.load(Ordering::SeqCst)
    }

    /// Make subsequent exports fail (records are not stored while failing).
    pub fn set_failing(&self, fail: bool) {
        self.fail_exports.store(fail, Ordering::SeqCst);
    }

    /// Forget everything exported so far.
    pub fn reset(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
        if let Ok(mut sizes) = self.batch_sizes.lock() {
            sizes.clear();
        }
    }
}

impl Exporter for InMemoryExporter {
    fn export(&self, batch: Vec<Record>) -> SdkResult {
        if let Some(delay) = self.export_delay {
            std::thread::sleep(delay);
        }
        if self.fail_exports.load(Ordering::SeqCst) {
            return Err(SdkError::InternalFailure(
                "InMemoryExporter configured to fail".into(),
            ));
        }
        self.batch_sizes.lock()?.push(batch.len());
        self.records.lock()?.extend(batch);
        Ok(())
    }

    fn shutdown_with_timeout(&self, _timeout: Duration) -> SdkResult {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        if self.should_reset_on_shutdown {
            self.reset();
        }
        Ok(())
    }
}
