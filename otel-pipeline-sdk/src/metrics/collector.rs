use crate::provider::Provider;
use crate::{otel_debug, otel_warn};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Pulls every meter of a provider and emits the resulting points.
///
/// [`MetricCollector::manual`] only collects when asked.
/// [`MetricCollector::periodic`] also collects from a background thread on an
/// interval, independently of the processor's export schedule. Provider
/// flush and shutdown only export points a collection already emitted.
///
/// The collector keeps a handle to the provider, so the provider is not shut
/// down by drop while a periodic collector is running.
#[derive(Debug)]
pub struct MetricCollector {
    provider: Provider,
    worker: Mutex<Option<(Sender<()>, JoinHandle<()>)>>,
}

impl MetricCollector {
    /// A collector that runs only when [`collect`](Self::collect) is called.
    pub fn manual(provider: Provider) -> Self {
        MetricCollector {
            provider,
            worker: Mutex::new(None),
        }
    }

    /// A collector that also runs every `interval`.
    ///
    /// Falls back to manual collection if the thread cannot be spawned.
    pub fn periodic(provider: Provider, interval: Duration) -> Self {
        let (stop_sender, stop_receiver) = mpsc::channel::<()>();
        let thread_provider = provider.clone();
        let spawned = thread::Builder::new()
            .name("Pipeline.MetricCollector".to_string())
            .spawn(move || loop {
                match stop_receiver.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => thread_provider.collect(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        let worker = match spawned {
            Ok(handle) => Some((stop_sender, handle)),
            Err(err) => {
                let error = err.to_string();
                otel_warn!(
                    name: "MetricCollector.ThreadSpawnFailed",
                    error = error.as_str()
                );
                None
            }
        };
        MetricCollector {
            provider,
            worker: Mutex::new(worker),
        }
    }

    /// Collect now.
    pub fn collect(&self) {
        self.provider.collect();
    }

    /// Stop the background thread, if any, after a final collection.
    /// Later calls do nothing.
    pub fn stop(&self) {
        let worker = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(_) => None,
        };
        if let Some((stop, handle)) = worker {
            let _ = stop.send(());
            if handle.join().is_err() {
                otel_warn!(name: "MetricCollector.WorkerPanicked");
            }
            self.provider.collect();
            otel_debug!(name: "MetricCollector.Stopped");
        }
    }
}

impl Drop for MetricCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::InMemoryExporter;
    use crate::processor::{BatchConfigBuilder, BatchProcessor};
    use crate::resource::InstrumentationScope;

    fn provider(exporter: &InMemoryExporter) -> Provider {
        Provider::builder()
            .with_processor(
                BatchProcessor::builder(exporter.clone())
                    .with_batch_config(BatchConfigBuilder::default().with_manual_export().build())
                    .build(),
            )
            .build()
    }

    #[test]
    fn manual_collection_emits_current_values() {
        let exporter = InMemoryExporter::default();
        let provider = provider(&exporter);
        let meter = provider.meter(InstrumentationScope::builder("collector-test").build());
        meter.counter("jobs").build().add(4_i64, &[]);

        let collector = MetricCollector::manual(provider.clone());
        collector.collect();
        provider.force_flush().unwrap();
        provider.force_flush().unwrap();

        assert_eq!(exporter.get_finished_records().unwrap().len(), 1);
        drop(collector);
        provider.shutdown().unwrap();
    }

    #[test]
    fn periodic_collection_runs_until_stopped() {
        let exporter = InMemoryExporter::default();
        let provider = provider(&exporter);
        let meter = provider.meter(InstrumentationScope::builder("collector-test").build());
        meter.counter("jobs").build().add(1_i64, &[]);

        let collector = MetricCollector::periodic(provider.clone(), Duration::from_millis(10));
        let mut waited = Duration::ZERO;
        let background = loop {
            provider.force_flush().unwrap();
            let exported = exporter.get_finished_records().unwrap().len();
            if exported > 0 || waited >= Duration::from_secs(5) {
                break exported;
            }
            thread::sleep(Duration::from_millis(10));
            waited += Duration::from_millis(10);
        };
        assert!(background > 0, "no background collection ran");

        collector.stop();
        provider.force_flush().unwrap();
        let collected = exporter.get_finished_records().unwrap().len();
        assert!(collected > background);

        collector.stop();
        provider.force_flush().unwrap();
        assert_eq!(exporter.get_finished_records().unwrap().len(), collected);
        provider.shutdown().unwrap();
    }
}
