//! # Simple Processor
//!
//! Forwards each record to the exporter synchronously on the calling thread.
//! Meant for debugging and tests: every `on_end` pays the full export cost,
//! including the exporter's retries.

use super::Processor;
use crate::context::Context;
use crate::error::{SdkError, SdkResult};
use crate::export::Exporter;
use crate::record::Record;
use crate::{otel_debug, otel_error, otel_warn};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Exports every record as soon as it ends.
#[derive(Debug)]
pub struct SimpleProcessor<T: Exporter> {
    exporter: Mutex<T>,
    is_shutdown: AtomicBool,
}

impl<T: Exporter> SimpleProcessor<T> {
    /// Wrap `exporter`.
    pub fn new(exporter: T) -> Self {
        SimpleProcessor {
            exporter: Mutex::new(exporter),
            is_shutdown: AtomicBool::new(false),
        }
    }
}

impl<T: Exporter> Processor for SimpleProcessor<T> {
    fn on_end(&self, record: Record) {
        if Context::is_current_telemetry_suppressed() {
            return;
        }
        let _suppress_guard = Context::enter_telemetry_suppressed_scope();
        if self.is_shutdown.load(Ordering::Relaxed) {
            otel_warn!(name: "SimpleProcessor.OnEnd.ProcessorShutdown");
            return;
        }

        let Ok(exporter) = self.exporter.lock() else {
            otel_debug!(name: "SimpleProcessor.OnEnd.MutexPoisoning");
            return;
        };
        // The exporter runs on the caller's thread; its panics stay here.
        match catch_unwind(AssertUnwindSafe(|| exporter.export(vec![record]))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                otel_error!(
                    name: "SimpleProcessor.OnEnd.ExportError",
                    error = format!("{err}")
                );
            }
            Err(_) => {
                otel_error!(name: "SimpleProcessor.OnEnd.ExportPanicked");
            }
        }
    }

    fn force_flush_with_timeout(&self, _timeout: Duration) -> SdkResult {
        if self.is_shutdown.load(Ordering::Relaxed) {
            return Err(SdkError::AlreadyShutdown);
        }
        match self.exporter.lock() {
            Ok(exporter) => exporter.force_flush(),
            Err(err) => Err(err.into()),
        }
    }

    fn shutdown_with_timeout(&self, timeout: Duration) -> SdkResult {
        if self.is_shutdown.swap(true, Ordering::SeqCst) {
            otel_warn!(
                name: "SimpleProcessor.Shutdown.AlreadyShutdown",
                message = "Shutdown is being invoked more than once. This is a no-op."
            );
            return Ok(());
        }
        match self.exporter.lock() {
            Ok(exporter) => exporter.shutdown_with_timeout(timeout),
            Err(_) => Err(SdkError::InternalFailure(
                "SimpleProcessor mutex poison at shutdown".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::InMemoryExporter;
    use crate::processor::tests::{numbered_record, seq_of};

    #[test]
    fn exports_each_record_immediately() {
        let exporter = InMemoryExporter::default();
        let processor = SimpleProcessor::new(exporter.clone());
        processor.on_end(numbered_record(1));
        processor.on_end(numbered_record(2));
        assert_eq!(exporter.batch_sizes(), vec![1, 1]);
        let seqs: Vec<i64> = exporter
            .get_finished_records()
            .unwrap()
            .iter()
            .map(seq_of)
            .collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let exporter = InMemoryExporter::default();
        let processor = SimpleProcessor::new(exporter.clone());
        assert!(processor.shutdown().is_ok());
        assert!(processor.shutdown().is_ok());
        assert_eq!(exporter.shutdown_count(), 1);

        processor.on_end(numbered_record(1));
        assert!(exporter.get_finished_records().unwrap().is_empty());
    }

    #[test]
    fn suppressed_records_are_ignored() {
        let exporter = InMemoryExporter::default();
        let processor = SimpleProcessor::new(exporter.clone());
        let _guard = Context::enter_telemetry_suppressed_scope();
        processor.on_end(numbered_record(1));
        assert!(exporter.batch_sizes().is_empty());
    }

    #[test]
    fn export_errors_do_not_reach_the_caller() {
        let exporter = InMemoryExporter::default();
        exporter.set_failing(true);
        let processor = SimpleProcessor::new(exporter.clone());
        processor.on_end(numbered_record(1));
        assert!(exporter.get_finished_records().unwrap().is_empty());
    }

    #[test]
    fn exporter_panics_do_not_reach_the_caller() {
        #[derive(Debug, Default)]
        struct PanickingExporter {
            calls: std::sync::atomic::AtomicUsize,
        }

        impl Exporter for PanickingExporter {
            fn export(&self, _batch: Vec<Record>) -> SdkResult {
                self.calls.fetch_add(1, Ordering::SeqCst);
                panic!("cannot block inside a runtime");
            }
        }

        let processor = SimpleProcessor::new(PanickingExporter::default());
        processor.on_end(numbered_record(1));
        processor.on_end(numbered_record(2));

        let calls = processor
            .exporter
            .lock()
            .unwrap()
            .calls
            .load(Ordering::SeqCst);
        assert_eq!(calls, 2, "the exporter lock must survive a panic");
        assert!(processor.shutdown().is_ok());
    }
}
