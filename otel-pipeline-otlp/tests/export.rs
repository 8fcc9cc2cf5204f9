//! Records emitted on a provider reach a collector through the OTLP exporter.
use otel_pipeline_otlp::proto::collector::{
    ExportLogsServiceRequest, ExportMetricsServiceRequest, ExportTraceServiceRequest,
};
use otel_pipeline_otlp::proto::common::any_value;
use otel_pipeline_otlp::proto::metrics::metric;
use otel_pipeline_otlp::{
    ExportRequest, ExportResponse, OtlpExporter, Protocol, RetryPolicy, TransportClient,
    TransportError,
};
use otel_pipeline_sdk::record::{LogRecord, Severity, SpanData};
use otel_pipeline_sdk::{InstrumentationScope, KeyValue, Provider, Resource, Signal};
use prost::Message;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Stands in for a collector: records requests and replays scripted failures.
#[derive(Clone, Debug, Default)]
struct FakeCollector {
    requests: Arc<Mutex<Vec<ExportRequest>>>,
    failures: Arc<Mutex<VecDeque<TransportError>>>,
    shutdowns: Arc<AtomicUsize>,
}

impl FakeCollector {
    fn failing_first(errors: impl IntoIterator<Item = TransportError>) -> Self {
        let collector = FakeCollector::default();
        collector.failures.lock().unwrap().extend(errors);
        collector
    }

    fn requests_for(&self, signal: Signal) -> Vec<ExportRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.signal == signal)
            .cloned()
            .collect()
    }
}

impl TransportClient for FakeCollector {
    fn send(&self, request: &ExportRequest) -> Result<ExportResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(ExportResponse::default()),
        }
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

fn provider(protocol: Protocol, collector: FakeCollector, retry: RetryPolicy) -> Provider {
    let exporter = OtlpExporter::builder()
        .with_protocol(protocol)
        .with_endpoint("http://collector.invalid:4318")
        .with_retry_policy(retry)
        .with_transport(collector)
        .build()
        .unwrap();
    Provider::builder()
        .with_resource(Resource::builder().with_service_name("checkout").build())
        .with_batch_exporter(exporter)
        .build()
}

fn scope() -> InstrumentationScope {
    InstrumentationScope::builder("checkout-handler").build()
}

#[test]
fn every_signal_arrives_grouped_by_resource_and_scope() {
    let collector = FakeCollector::default();
    let provider = provider(Protocol::HttpBinary, collector.clone(), RetryPolicy::no_retry());
    let shared_scope = Arc::new(scope());

    for n in 0..3 {
        provider.emit(
            LogRecord::builder()
                .with_severity(Severity::Info)
                .with_body(format!("order {n}"))
                .build(provider.resource().clone(), shared_scope.clone()),
        );
    }
    provider.emit(SpanData::builder("POST /orders").build(provider.resource().clone(), shared_scope.clone()));

    let meter = provider.meter(scope());
    let orders = meter.counter("orders").with_unit("{order}").build();
    orders.add(2_i64, &[KeyValue::new("region", "eu")]);
    orders.add(1_i64, &[KeyValue::new("region", "eu")]);
    provider.collect();

    provider.force_flush().unwrap();

    let logs = collector.requests_for(Signal::Logs);
    let request = ExportLogsServiceRequest::decode(logs[0].body.as_slice()).unwrap();
    assert_eq!(request.resource_logs.len(), 1);
    let resource = request.resource_logs[0].resource.as_ref().unwrap();
    assert!(resource.attributes.iter().any(|kv| kv.key == "service.name"));
    let records = &request.resource_logs[0].scope_logs[0].log_records;
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].severity_number, Severity::Info as i32);
    assert_eq!(
        records[2].body.as_ref().and_then(|body| body.value.clone()),
        Some(any_value::Value::StringValue("order 2".into()))
    );

    let spans = collector.requests_for(Signal::Traces);
    let request = ExportTraceServiceRequest::decode(spans[0].body.as_slice()).unwrap();
    assert_eq!(
        request.resource_spans[0].scope_spans[0].spans[0].name,
        "POST /orders"
    );

    let metrics = collector.requests_for(Signal::Metrics);
    let request = ExportMetricsServiceRequest::decode(metrics[0].body.as_slice()).unwrap();
    let metric = &request.resource_metrics[0].scope_metrics[0].metrics[0];
    assert_eq!(metric.name, "orders");
    assert_eq!(metric.unit, "{order}");
    assert!(matches!(
        &metric.data,
        Some(metric::Data::Sum(sum)) if sum.is_monotonic && sum.data_points.len() == 1
    ));

    provider.shutdown().unwrap();
    assert_eq!(collector.shutdowns.load(Ordering::SeqCst), 1);
}

#[test]
fn json_payloads_use_the_json_mapping() {
    let collector = FakeCollector::default();
    let provider = provider(Protocol::HttpJson, collector.clone(), RetryPolicy::no_retry());

    provider.emit(
        SpanData::builder("GET /cart").build(provider.resource().clone(), Arc::new(scope())),
    );
    provider.force_flush().unwrap();

    let request = &collector.requests_for(Signal::Traces)[0];
    assert_eq!(request.content_type, "application/json");
    let json: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    let span = &json["resourceSpans"][0]["scopeSpans"][0]["spans"][0];
    assert_eq!(span["name"], "GET /cart");
    assert!(span["startTimeUnixNano"].is_string());
    provider.shutdown().unwrap();
}

#[test]
fn transient_failures_are_retried_until_delivered() {
    let collector = FakeCollector::failing_first([
        TransportError::retryable("connection reset"),
        TransportError::throttled(Duration::from_millis(5), "HTTP 429"),
    ]);
    let retry = RetryPolicy::default()
        .with_initial_delay(Duration::from_millis(1))
        .with_max_delay(Duration::from_millis(10));
    let provider = provider(Protocol::HttpBinary, collector.clone(), retry);

    provider.emit(
        LogRecord::builder()
            .with_body("retry me")
            .build(provider.resource().clone(), Arc::new(scope())),
    );
    provider.force_flush().unwrap();

    let attempts = collector.requests_for(Signal::Logs);
    assert_eq!(attempts.len(), 3);
    assert!(attempts.windows(2).all(|pair| pair[0] == pair[1]));
    provider.shutdown().unwrap();
}

#[test]
fn permanent_failures_drop_the_batch_without_stalling_the_pipeline() {
    let collector = FakeCollector::failing_first([TransportError::non_retryable("HTTP 400")]);
    let provider = provider(Protocol::HttpBinary, collector.clone(), RetryPolicy::default());

    for body in ["rejected", "accepted"] {
        provider.emit(
            LogRecord::builder()
                .with_body(body)
                .build(provider.resource().clone(), Arc::new(scope())),
        );
        provider.force_flush().unwrap();
    }

    // One attempt for the rejected batch, one for the next.
    assert_eq!(collector.requests_for(Signal::Logs).len(), 2);
    provider.shutdown().unwrap();
}

#[cfg(feature = "grpc-tonic")]
#[tokio::test]
async fn simple_export_from_async_code_fails_without_panicking() {
    // Nothing listens on port 1.
    let exporter = OtlpExporter::builder()
        .with_protocol(Protocol::Grpc)
        .with_endpoint("http://127.0.0.1:1")
        .with_timeout(Duration::from_millis(500))
        .with_retry_policy(RetryPolicy::no_retry())
        .build()
        .unwrap();
    let provider = Provider::builder().with_simple_exporter(exporter).build();

    provider.emit(
        LogRecord::builder()
            .with_body("from a request handler")
            .build(provider.resource().clone(), Arc::new(scope())),
    );
    assert!(provider.shutdown().is_ok());
}
