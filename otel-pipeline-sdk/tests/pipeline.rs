//! End-to-end behaviour of provider, batch processor and exporter together.
use otel_pipeline_sdk::export::{Exporter, InMemoryExporter, InMemoryExporterBuilder};
use otel_pipeline_sdk::processor::{BatchConfigBuilder, BatchProcessor, Processor};
use otel_pipeline_sdk::record::{LogRecord, Record, SpanData};
use otel_pipeline_sdk::{
    Context, InstrumentationScope, KeyValue, Provider, Resource, SdkError, SdkResult, Value,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn record(thread_id: i64, seq: i64) -> LogRecord {
    LogRecord::builder()
        .with_body("integration")
        .with_attributes([
            KeyValue::new("thread", thread_id),
            KeyValue::new("seq", seq),
        ])
        .build(
            Arc::new(Resource::empty()),
            InstrumentationScope::builder("integration").build_shared(),
        )
}

fn ids(records: &[Record]) -> Vec<(i64, i64)> {
    records
        .iter()
        .filter_map(|r| match r {
            Record::Log(log) => match (&log.attributes[0].value, &log.attributes[1].value) {
                (Value::I64(t), Value::I64(s)) => Some((*t, *s)),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

#[test]
fn every_record_is_exported_exactly_once_or_counted_as_dropped() {
    let exporter = InMemoryExporterBuilder::new()
        .with_export_delay(Duration::from_millis(1))
        .build();
    let processor = Arc::new(
        BatchProcessor::builder(exporter.clone())
            .with_batch_config(
                BatchConfigBuilder::default()
                    .with_max_queue_size(64)
                    .with_max_export_batch_size(16)
                    .with_scheduled_delay(Duration::from_millis(10))
                    .build(),
            )
            .build(),
    );

    let threads = 8;
    let per_thread = 500;
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let processor = processor.clone();
            thread::spawn(move || {
                for seq in 0..per_thread {
                    processor.on_end(record(t, seq).into());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    processor.shutdown().unwrap();

    let exported = ids(&exporter.get_finished_records().unwrap());
    let unique: HashSet<_> = exported.iter().copied().collect();
    assert_eq!(unique.len(), exported.len(), "a record was exported twice");
    assert_eq!(
        exported.len() + processor.dropped_records_count(),
        (threads * per_thread) as usize
    );
    assert!(exporter.batch_sizes().iter().all(|size| *size <= 16));
}

#[test]
fn flush_returns_only_after_everything_queued_was_exported() {
    let exporter = InMemoryExporter::default();
    let provider = Provider::builder()
        .with_processor(
            BatchProcessor::builder(exporter.clone())
                .with_batch_config(BatchConfigBuilder::default().with_manual_export().build())
                .build(),
        )
        .build();

    for seq in 0..100 {
        provider.emit(record(0, seq));
    }
    provider.force_flush().unwrap();

    let exported = ids(&exporter.get_finished_records().unwrap());
    let expected: Vec<_> = (0..100).map(|seq| (0, seq)).collect();
    assert_eq!(exported, expected);
    provider.shutdown().unwrap();
}

#[test]
fn records_emitted_inside_export_do_not_loop_back() {
    #[derive(Debug)]
    struct ReentrantExporter {
        provider: std::sync::OnceLock<Provider>,
        inner: InMemoryExporter,
    }

    impl Exporter for ReentrantExporter {
        fn export(&self, batch: Vec<Record>) -> SdkResult {
            assert!(Context::is_current_telemetry_suppressed());
            if let Some(provider) = self.provider.get() {
                // Telemetry produced while exporting is suppressed.
                provider.emit(record(99, 0));
            }
            self.inner.export(batch)
        }
    }

    let inner = InMemoryExporter::default();
    let exporter = Arc::new(ReentrantExporter {
        provider: std::sync::OnceLock::new(),
        inner: inner.clone(),
    });

    #[derive(Debug)]
    struct Shared(Arc<ReentrantExporter>);
    impl Exporter for Shared {
        fn export(&self, batch: Vec<Record>) -> SdkResult {
            self.0.export(batch)
        }
    }

    let provider = Provider::builder()
        .with_batch_exporter(Shared(exporter.clone()))
        .build();
    let _ = exporter.provider.set(provider.clone());

    provider.emit(record(0, 0));
    provider.force_flush().unwrap();
    provider.force_flush().unwrap();
    assert_eq!(ids(&inner.get_finished_records().unwrap()), vec![(0, 0)]);
    provider.shutdown().unwrap();
}

#[test]
fn shutdown_survives_a_broken_processor() {
    #[derive(Debug)]
    struct Broken;

    impl Processor for Broken {
        fn on_end(&self, _record: Record) {}

        fn force_flush_with_timeout(&self, _timeout: Duration) -> SdkResult {
            Err(SdkError::InternalFailure("broken".into()))
        }

        fn shutdown_with_timeout(&self, _timeout: Duration) -> SdkResult {
            panic!("broken processor");
        }
    }

    let exporter = InMemoryExporter::default();
    let provider = Provider::builder()
        .with_processor(Broken)
        .with_batch_exporter(exporter.clone())
        .build();
    provider.emit(SpanData::builder("request").build(
        provider.resource().clone(),
        InstrumentationScope::builder("integration").build_shared(),
    ));

    assert!(provider.shutdown().is_err());
    assert!(provider.shutdown().is_ok());
    assert_eq!(exporter.get_finished_records().unwrap().len(), 1);
    assert_eq!(exporter.shutdown_count(), 1);
}

#[test]
fn shutdown_timeout_unblocks_the_caller_but_keeps_draining() {
    let exporter = InMemoryExporterBuilder::new()
        .with_export_delay(Duration::from_millis(200))
        .build();
    let provider = Provider::builder()
        .with_batch_exporter(exporter.clone())
        .build();
    for seq in 0..3 {
        provider.emit(record(0, seq));
    }

    let result = provider.shutdown_with_timeout(Duration::from_millis(20));
    assert!(matches!(result, Err(SdkError::Timeout(_))));

    // The worker finishes the final drain in the background.
    let mut waited = Duration::ZERO;
    while exporter.shutdown_count() == 0 && waited < Duration::from_secs(5) {
        thread::sleep(Duration::from_millis(20));
        waited += Duration::from_millis(20);
    }
    assert_eq!(exporter.get_finished_records().unwrap().len(), 3);
}
