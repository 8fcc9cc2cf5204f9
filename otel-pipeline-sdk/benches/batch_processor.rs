/*
    Measures the producer-side cost of handing a record to a processor.
    The batch processor runs with a no-op exporter so that only enqueueing
    and the worker handoff are measured.
*/

use criterion::{criterion_group, criterion_main, Criterion};
use otel_pipeline_sdk::export::Exporter;
use otel_pipeline_sdk::processor::{BatchConfigBuilder, BatchProcessor, Processor};
use otel_pipeline_sdk::record::{LogRecord, Record, Severity};
use otel_pipeline_sdk::{InstrumentationScope, KeyValue, Resource, SdkResult};
use std::sync::Arc;
use std::thread;

// Run this benchmark with:
// cargo bench --bench batch_processor

#[derive(Debug)]
struct NoopExporter;

impl Exporter for NoopExporter {
    fn export(&self, _batch: Vec<Record>) -> SdkResult {
        Ok(())
    }
}

fn create_record(resource: &Arc<Resource>, scope: &Arc<InstrumentationScope>) -> Record {
    LogRecord::builder()
        .with_event_name("CheckoutFailed")
        .with_severity(Severity::Warn)
        .with_body("Unable to process checkout.")
        .with_attributes([
            KeyValue::new("book_id", "12345"),
            KeyValue::new("book_title", "Rust Programming Adventures"),
        ])
        .build(resource.clone(), scope.clone())
        .into()
}

fn criterion_benchmark(c: &mut Criterion) {
    let resource = Arc::new(Resource::builder().with_service_name("bench").build());
    let scope = InstrumentationScope::builder("bench").build_shared();

    c.bench_function("batch_processor_on_end", |b| {
        let processor = BatchProcessor::builder(NoopExporter)
            .with_batch_config(BatchConfigBuilder::default().with_max_queue_size(65_536).build())
            .build();
        b.iter(|| processor.on_end(create_record(&resource, &scope)));
        let _ = processor.shutdown();
    });

    c.bench_function("batch_processor_on_end_4_threads", |b| {
        let processor = Arc::new(
            BatchProcessor::builder(NoopExporter)
                .with_batch_config(
                    BatchConfigBuilder::default().with_max_queue_size(65_536).build(),
                )
                .build(),
        );
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let processor = processor.clone();
                    let resource = resource.clone();
                    let scope = scope.clone();
                    thread::spawn(move || {
                        for _ in 0..100 {
                            processor.on_end(create_record(&resource, &scope));
                        }
                    })
                })
                .collect();
            for handle in handles {
                let _ = handle.join();
            }
        });
        let _ = processor.shutdown();
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
