//! OTLP encoding, transports and exporter for the telemetry export pipeline.
//!
//! [`OtlpExporter`] plugs into any processor of `otel-pipeline-sdk`. It
//! splits each batch by signal, encodes it with the [`Encoder`] for the
//! configured [`Protocol`] and delivers it through a [`TransportClient`]
//! wrapped in a [`RetryingClient`].
//!
//! ```no_run
//! use otel_pipeline_otlp::{OtlpExporter, Protocol};
//! use otel_pipeline_sdk::Provider;
//!
//! let exporter = OtlpExporter::builder()
//!     .with_protocol(Protocol::Grpc)
//!     .with_endpoint("http://localhost:4317")
//!     .build()?;
//! let provider = Provider::builder().with_batch_exporter(exporter).build();
//! // ... emit records ...
//! provider.shutdown()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Configuration
//!
//! Every option can come from the builder or from the standard
//! `OTEL_EXPORTER_OTLP_*` environment variables; the builder wins. See the
//! constants in this crate for the variable names.
//!
//! ## Crate Feature Flags
//!
//! * `http-client` (default): `http/protobuf` and `http/json` over a blocking
//!   `reqwest` client.
//! * `grpc-tonic` (default): `grpc` over `tonic`, driven by a private
//!   current-thread tokio runtime.
//! * `tls` (default): TLS for gRPC channels.
//! * `internal-logs` (default): emit the exporter's own diagnostics as
//!   `tracing` events.
//!
//! Both transports block the calling thread, so `export` is best called from
//! the batch processor's worker thread. A call made on a thread that drives a
//! tokio runtime is moved to a short-lived helper thread.
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod encoder;
mod exporter;
mod otlp;
pub mod proto;
pub mod retry;
pub mod retry_classification;
mod transform;
pub mod transport;

pub use crate::encoder::{
    EncodeError, Encoder, Protocol, UnknownProtocol, CONTENT_TYPE_JSON, CONTENT_TYPE_PROTOBUF,
};
pub use crate::exporter::{
    Compression, ExportConfig, ExporterBuildError, OTEL_EXPORTER_OTLP_CERTIFICATE,
    OTEL_EXPORTER_OTLP_CLIENT_CERTIFICATE, OTEL_EXPORTER_OTLP_CLIENT_KEY,
    OTEL_EXPORTER_OTLP_COMPRESSION, OTEL_EXPORTER_OTLP_ENDPOINT,
    OTEL_EXPORTER_OTLP_GRPC_ENDPOINT_DEFAULT, OTEL_EXPORTER_OTLP_HEADERS,
    OTEL_EXPORTER_OTLP_HTTP_ENDPOINT_DEFAULT, OTEL_EXPORTER_OTLP_LOGS_CERTIFICATE,
    OTEL_EXPORTER_OTLP_LOGS_CLIENT_CERTIFICATE, OTEL_EXPORTER_OTLP_LOGS_CLIENT_KEY,
    OTEL_EXPORTER_OTLP_LOGS_COMPRESSION, OTEL_EXPORTER_OTLP_LOGS_ENDPOINT,
    OTEL_EXPORTER_OTLP_LOGS_HEADERS, OTEL_EXPORTER_OTLP_LOGS_TIMEOUT,
    OTEL_EXPORTER_OTLP_METRICS_CERTIFICATE, OTEL_EXPORTER_OTLP_METRICS_CLIENT_CERTIFICATE,
    OTEL_EXPORTER_OTLP_METRICS_CLIENT_KEY, OTEL_EXPORTER_OTLP_METRICS_COMPRESSION,
    OTEL_EXPORTER_OTLP_METRICS_ENDPOINT, OTEL_EXPORTER_OTLP_METRICS_HEADERS,
    OTEL_EXPORTER_OTLP_METRICS_TIMEOUT, OTEL_EXPORTER_OTLP_PROTOCOL, OTEL_EXPORTER_OTLP_TIMEOUT,
    OTEL_EXPORTER_OTLP_TIMEOUT_DEFAULT, OTEL_EXPORTER_OTLP_TRACES_CERTIFICATE,
    OTEL_EXPORTER_OTLP_TRACES_CLIENT_CERTIFICATE, OTEL_EXPORTER_OTLP_TRACES_CLIENT_KEY,
    OTEL_EXPORTER_OTLP_TRACES_COMPRESSION, OTEL_EXPORTER_OTLP_TRACES_ENDPOINT,
    OTEL_EXPORTER_OTLP_TRACES_HEADERS, OTEL_EXPORTER_OTLP_TRACES_TIMEOUT,
};
pub use crate::otlp::{OtlpExporter, OtlpExporterBuilder};
pub use crate::retry::{RetryErrorType, RetryPolicy, RetryingClient};
pub use crate::transport::{ExportRequest, ExportResponse, TransportClient, TransportError};
