//! Record model, batching and lifecycle for a telemetry export pipeline.
//!
//! Producers hand finished spans, log records and metric points to a
//! [`Provider`], which fans them out to [`Processor`]s. The
//! [`BatchProcessor`] buffers records in a bounded queue and exports them
//! from a dedicated worker thread, either on an interval or when asked to
//! flush. Exporters that speak a wire protocol live in separate crates and
//! plug in through the [`Exporter`] trait.
//!
//! ```
//! use otel_pipeline_sdk::export::InMemoryExporter;
//! use otel_pipeline_sdk::record::LogRecord;
//! use otel_pipeline_sdk::{InstrumentationScope, Provider, Resource};
//!
//! let exporter = InMemoryExporter::default();
//! let provider = Provider::builder()
//!     .with_resource(Resource::builder().with_service_name("checkout").build())
//!     .with_batch_exporter(exporter.clone())
//!     .build();
//!
//! let record = LogRecord::builder().with_body("order placed").build(
//!     provider.resource().clone(),
//!     InstrumentationScope::builder("checkout").build_shared(),
//! );
//! provider.emit(record);
//! provider.shutdown().unwrap();
//!
//! assert_eq!(exporter.get_finished_records().unwrap().len(), 1);
//! ```
//!
//! ## Crate Feature Flags
//!
//! * `internal-logs` (enabled by default): emit the pipeline's own
//!   diagnostics as `tracing` events.
//!
//! [`Processor`]: processor::Processor
//! [`BatchProcessor`]: processor::BatchProcessor
//! [`Exporter`]: export::Exporter
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod internal_logging;

pub mod common;
pub mod context;
pub mod error;
pub mod export;
pub mod global;
pub mod ids;
pub mod metrics;
pub mod processor;
pub mod provider;
pub mod record;
pub mod resource;

pub use common::{AnyValue, Array, AttributeLimits, Key, KeyValue, Value};
pub use context::{Context, ContextGuard};
pub use error::{SdkError, SdkResult};
pub use provider::{Provider, ProviderBuilder};
pub use record::{Record, Signal};
pub use resource::{InstrumentationScope, Resource};

#[cfg(feature = "internal-logs")]
#[doc(hidden)]
pub mod _private {
    pub use tracing::{debug, error, info, warn};
}
