//! # Provider
//!
//! The composition root: owns the processors, hands records to them and
//! drives the flush and shutdown lifecycle. Meters created through the
//! provider are collected into it on every flush.
use crate::error::{SdkError, SdkResult};
use crate::export::Exporter;
use crate::metrics::Meter;
use crate::processor::{BatchProcessor, Processor, SimpleProcessor};
use crate::record::Record;
use crate::resource::{InstrumentationScope, Resource};
use crate::{otel_debug, otel_info, otel_warn};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Budget shared by all processors in the untimed `force_flush` and `shutdown`.
const DEFAULT_LIFECYCLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the pipeline.
///
/// Clones share one pipeline. Dropping the last clone shuts it down, so
/// records queued in batch processors are flushed even when `shutdown` is
/// never called.
#[derive(Debug, Clone)]
pub struct Provider {
    inner: Arc<ProviderInner>,
}

#[derive(Debug)]
struct ProviderInner {
    processors: Vec<Box<dyn Processor>>,
    resource: Arc<Resource>,
    meters: Mutex<Vec<Meter>>,
    lifecycle_timeout: Duration,
    is_shutdown: AtomicBool,
}

impl Provider {
    /// Start configuring a provider.
    pub fn builder() -> ProviderBuilder {
        ProviderBuilder::default()
    }

    /// The resource shared by every record of this provider.
    pub fn resource(&self) -> &Arc<Resource> {
        &self.inner.resource
    }

    /// Whether `shutdown` has been called.
    pub fn is_shutdown(&self) -> bool {
        self.inner.is_shutdown.load(Ordering::Relaxed)
    }

    /// Hand `record` to every processor, in registration order.
    ///
    /// After shutdown the record is discarded.
    pub fn emit(&self, record: impl Into<Record>) {
        if self.is_shutdown() {
            otel_debug!(
                name: "Provider.Emit.AfterShutdown",
                message = "Record discarded; the provider is shut down."
            );
            return;
        }
        let record = record.into();
        if let Some((last, rest)) = self.inner.processors.split_last() {
            for processor in rest {
                processor.on_end(record.clone());
            }
            last.on_end(record);
        }
    }

    /// A meter reporting under `scope` on this provider's resource.
    pub fn meter(&self, scope: InstrumentationScope) -> Meter {
        let meter = Meter::new(Arc::new(scope), self.inner.resource.clone());
        if self.is_shutdown() {
            otel_debug!(
                name: "Provider.Meter.AfterShutdown",
                meter_name = meter.scope().name().to_string()
            );
            return meter;
        }
        match self.inner.meters.lock() {
            Ok(mut meters) => meters.push(meter.clone()),
            Err(_) => {
                otel_debug!(name: "Provider.Meter.MutexPoisoning");
            }
        }
        meter
    }

    /// Snapshot every meter and emit the resulting metric points.
    ///
    /// This is the only path that turns instruments into records: flush and
    /// shutdown export what was already emitted. See [`MetricCollector`].
    ///
    /// [`MetricCollector`]: crate::metrics::MetricCollector
    pub fn collect(&self) {
        let meters = match self.inner.meters.lock() {
            Ok(meters) => meters.clone(),
            Err(_) => return,
        };
        for meter in meters {
            for record in meter.collect() {
                self.emit(record);
            }
        }
    }

    /// Flush all processors with the provider's default budget.
    pub fn force_flush(&self) -> SdkResult {
        self.force_flush_with_timeout(self.inner.lifecycle_timeout)
    }

    /// Flush every processor. All processors share one deadline.
    pub fn force_flush_with_timeout(&self, timeout: Duration) -> SdkResult {
        if self.is_shutdown() {
            return Err(SdkError::AlreadyShutdown);
        }
        let errors = self
            .inner
            .for_each_processor(timeout, "flush", |p, t| p.force_flush_with_timeout(t));
        combine("flush", errors)
    }

    /// Shut down with the provider's default budget.
    pub fn shutdown(&self) -> SdkResult {
        self.shutdown_with_timeout(self.inner.lifecycle_timeout)
    }

    /// Shut down every processor within a shared deadline.
    ///
    /// A failing or panicking processor does not stop the others from
    /// shutting down; its error is logged and reported in the result. A
    /// second call logs a warning and returns `Ok`.
    pub fn shutdown_with_timeout(&self, timeout: Duration) -> SdkResult {
        otel_debug!(name: "Provider.ShutdownInvokedByUser");
        if self.is_shutdown() {
            otel_warn!(
                name: "Provider.Shutdown.AlreadyShutdown",
                message = "Shutdown is being invoked more than once. This is a no-op."
            );
            return Ok(());
        }
        match self.inner.shutdown(timeout) {
            Some(errors) => combine("shutdown", errors),
            None => {
                otel_warn!(
                    name: "Provider.Shutdown.AlreadyShutdown",
                    message = "Shutdown is being invoked more than once. This is a no-op."
                );
                Ok(())
            }
        }
    }
}

impl ProviderInner {
    /// Returns `None` when shutdown already happened.
    fn shutdown(&self, timeout: Duration) -> Option<Vec<SdkError>> {
        if self
            .is_shutdown
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        Some(self.for_each_processor(timeout, "shutdown", |p, t| p.shutdown_with_timeout(t)))
    }

    fn for_each_processor<F>(&self, timeout: Duration, operation: &'static str, f: F) -> Vec<SdkError>
    where
        F: Fn(&dyn Processor, Duration) -> SdkResult,
    {
        let deadline = Instant::now() + timeout;
        let mut errors = Vec::new();
        for processor in &self.processors {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let result = catch_unwind(AssertUnwindSafe(|| f(processor.as_ref(), remaining)))
                .unwrap_or_else(|_| {
                    Err(SdkError::InternalFailure(format!(
                        "processor panicked during {operation}"
                    )))
                });
            if let Err(err) = result {
                // Also returned to the caller, or unactionable during drop.
                otel_debug!(
                    name: "Provider.ProcessorError",
                    operation = operation,
                    error = format!("{err}")
                );
                errors.push(err);
            }
        }
        errors
    }
}

impl Drop for ProviderInner {
    fn drop(&mut self) {
        if self.is_shutdown.load(Ordering::Relaxed) {
            otel_debug!(
                name: "Provider.Drop.AlreadyShutdown",
                message = "Provider was already shut down; drop will not attempt shutdown again."
            );
            return;
        }
        otel_info!(
            name: "Provider.Drop",
            message = "Last reference of Provider dropped, initiating shutdown."
        );
        let _ = self.shutdown(self.lifecycle_timeout);
    }
}

fn combine(operation: &str, mut errors: Vec<SdkError>) -> SdkResult {
    if errors.len() > 1 {
        return Err(SdkError::InternalFailure(format!(
            "{operation} errors: {errors:?}"
        )));
    }
    // A single error keeps its variant so callers can match on a timeout.
    errors.pop().map_or(Ok(()), Err)
}

/// Builder for [`Provider`].
#[derive(Debug)]
pub struct ProviderBuilder {
    processors: Vec<Box<dyn Processor>>,
    resource: Option<Resource>,
    lifecycle_timeout: Duration,
}

impl Default for ProviderBuilder {
    fn default() -> Self {
        ProviderBuilder {
            processors: Vec::new(),
            resource: None,
            lifecycle_timeout: DEFAULT_LIFECYCLE_TIMEOUT,
        }
    }
}

impl ProviderBuilder {
    /// Add a processor. Processors see records in the order they are added.
    pub fn with_processor<T: Processor + 'static>(mut self, processor: T) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// Add a [`BatchProcessor`] with default configuration around `exporter`.
    pub fn with_batch_exporter<E: Exporter + 'static>(self, exporter: E) -> Self {
        let batch = BatchProcessor::builder(exporter).build();
        self.with_processor(batch)
    }

    /// Add a [`SimpleProcessor`] around `exporter`.
    pub fn with_simple_exporter<E: Exporter + 'static>(self, exporter: E) -> Self {
        self.with_processor(SimpleProcessor::new(exporter))
    }

    /// The resource to attach to records.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Budget shared by all processors in the untimed `force_flush` and
    /// `shutdown`, and on drop.
    pub fn with_lifecycle_timeout(mut self, timeout: Duration) -> Self {
        self.lifecycle_timeout = timeout;
        self
    }

    /// Build the provider.
    pub fn build(self) -> Provider {
        let provider = Provider {
            inner: Arc::new(ProviderInner {
                processors: self.processors,
                resource: Arc::new(self.resource.unwrap_or_else(Resource::empty)),
                meters: Mutex::new(Vec::new()),
                lifecycle_timeout: self.lifecycle_timeout,
                is_shutdown: AtomicBool::new(false),
            }),
        };
        otel_debug!(name: "Provider.Built");
        provider
    }
}
