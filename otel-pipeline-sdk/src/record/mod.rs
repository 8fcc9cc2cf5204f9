//! The unit of telemetry handed to a processor.
//!
//! A [`Record`] is fully formed when it reaches the pipeline: resource,
//! scope, attributes and timestamps are attached and never change again.
//! Ownership moves into the processor at [`Processor::on_end`].
//!
//! [`Processor::on_end`]: crate::processor::Processor::on_end
mod log;
mod metric;
mod span;

pub use log::{LogRecord, LogRecordBuilder, Severity, TraceContext};
pub use metric::{
    Gauge, Histogram, MetricData, MetricPoint, MetricPointBuilder, NumberValue, Sum, Temporality,
};
pub use span::{Event, Link, SpanData, SpanDataBuilder, SpanKind, Status};

use crate::resource::{InstrumentationScope, Resource};
use std::fmt;
use std::sync::Arc;

/// The three kinds of telemetry the pipeline carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signal {
    /// Spans
    Traces,
    /// Metric points
    Metrics,
    /// Log records
    Logs,
}

impl Signal {
    /// All signals, in the order the exporter sends them.
    pub const ALL: [Signal; 3] = [Signal::Traces, Signal::Metrics, Signal::Logs];

    /// Lowercase name used in endpoint paths and environment variables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Traces => "traces",
            Signal::Metrics => "metrics",
            Signal::Logs => "logs",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of telemetry: a finished span, a log record or a metric point.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    /// A finished span
    Span(SpanData),
    /// A log record
    Log(LogRecord),
    /// A metric data point
    Metric(MetricPoint),
}

impl Record {
    /// Signal this record belongs to.
    pub fn signal(&self) -> Signal {
        match self {
            Record::Span(_) => Signal::Traces,
            Record::Log(_) => Signal::Logs,
            Record::Metric(_) => Signal::Metrics,
        }
    }

    /// Resource the record was produced by.
    pub fn resource(&self) -> &Arc<Resource> {
        match self {
            Record::Span(s) => &s.resource,
            Record::Log(l) => &l.resource,
            Record::Metric(m) => &m.resource,
        }
    }

    /// Instrumentation scope the record was produced by.
    pub fn scope(&self) -> &Arc<InstrumentationScope> {
        match self {
            Record::Span(s) => &s.scope,
            Record::Log(l) => &l.scope,
            Record::Metric(m) => &m.scope,
        }
    }
}

impl From<SpanData> for Record {
    fn from(span: SpanData) -> Self {
        Record::Span(span)
    }
}

impl From<LogRecord> for Record {
    fn from(log: LogRecord) -> Self {
        Record::Log(log)
    }
}

impl From<MetricPoint> for Record {
    fn from(point: MetricPoint) -> Self {
        Record::Metric(point)
    }
}
