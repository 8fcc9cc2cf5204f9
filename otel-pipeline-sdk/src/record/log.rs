use crate::common::{AnyValue, AttributeLimits, KeyValue};
use crate::context::Context;
use crate::ids::{SpanId, TraceFlags, TraceId};
use crate::resource::{InstrumentationScope, Resource};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::SystemTime;

/// Severity of a log record, numbered as in the OTLP `SeverityNumber` enum.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum Severity {
    /// TRACE
    Trace = 1,
    /// TRACE2
    Trace2 = 2,
    /// TRACE3
    Trace3 = 3,
    /// TRACE4
    Trace4 = 4,
    /// DEBUG
    Debug = 5,
    /// DEBUG2
    Debug2 = 6,
    /// DEBUG3
    Debug3 = 7,
    /// DEBUG4
    Debug4 = 8,
    /// INFO
    Info = 9,
    /// INFO2
    Info2 = 10,
    /// INFO3
    Info3 = 11,
    /// INFO4
    Info4 = 12,
    /// WARN
    Warn = 13,
    /// WARN2
    Warn2 = 14,
    /// WARN3
    Warn3 = 15,
    /// WARN4
    Warn4 = 16,
    /// ERROR
    Error = 17,
    /// ERROR2
    Error2 = 18,
    /// ERROR3
    Error3 = 19,
    /// ERROR4
    Error4 = 20,
    /// FATAL
    Fatal = 21,
    /// FATAL2
    Fatal2 = 22,
    /// FATAL3
    Fatal3 = 23,
    /// FATAL4
    Fatal4 = 24,
}

impl Severity {
    /// The short upper case name of the severity range this value is in.
    pub const fn name(&self) -> &'static str {
        match *self as i32 {
            1..=4 => "TRACE",
            5..=8 => "DEBUG",
            9..=12 => "INFO",
            13..=16 => "WARN",
            17..=20 => "ERROR",
            _ => "FATAL",
        }
    }
}

/// Ids of the span that was active when a log record was emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceContext {
    /// Trace id
    pub trace_id: TraceId,
    /// Span id
    pub span_id: SpanId,
    /// Trace flags
    pub trace_flags: Option<TraceFlags>,
}

/// A log record.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Name of the event, for event-style records.
    pub event_name: Option<Cow<'static, str>>,
    /// When the event occurred, if known.
    pub timestamp: Option<SystemTime>,
    /// When the record was observed by the SDK.
    pub observed_timestamp: SystemTime,
    /// Correlation with the active span.
    pub trace_context: Option<TraceContext>,
    /// Original severity text.
    pub severity_text: Option<Cow<'static, str>>,
    /// Numeric severity.
    pub severity_number: Option<Severity>,
    /// Record body.
    pub body: Option<AnyValue>,
    /// Additional attributes.
    pub attributes: Vec<KeyValue>,
    /// Attributes removed by limits.
    pub dropped_attributes_count: u32,
    /// Resource the record was produced by
    pub resource: Arc<Resource>,
    /// Instrumentation scope that produced this record
    pub scope: Arc<InstrumentationScope>,
}

impl LogRecord {
    /// Start building a record, correlated with the current context's span.
    pub fn builder() -> LogRecordBuilder {
        let trace_context = Context::current_span()
            .filter(|span| span.is_valid())
            .map(|span| TraceContext {
                trace_id: span.trace_id,
                span_id: span.span_id,
                trace_flags: Some(span.trace_flags),
            });
        LogRecordBuilder {
            event_name: None,
            timestamp: None,
            trace_context,
            severity_text: None,
            severity_number: None,
            body: None,
            attributes: Vec::new(),
            limits: None,
        }
    }
}

/// Builder for [`LogRecord`].
#[derive(Debug)]
pub struct LogRecordBuilder {
    event_name: Option<Cow<'static, str>>,
    timestamp: Option<SystemTime>,
    trace_context: Option<TraceContext>,
    severity_text: Option<Cow<'static, str>>,
    severity_number: Option<Severity>,
    body: Option<AnyValue>,
    attributes: Vec<KeyValue>,
    limits: Option<AttributeLimits>,
}

impl LogRecordBuilder {
    /// Set the event name.
    pub fn with_event_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.event_name = Some(name.into());
        self
    }

    /// Set the time the event occurred.
    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set severity; the text defaults to the severity's name.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity_number = Some(severity);
        if self.severity_text.is_none() {
            self.severity_text = Some(Cow::Borrowed(severity.name()));
        }
        self
    }

    /// Set the original severity text.
    pub fn with_severity_text(mut self, text: impl Into<Cow<'static, str>>) -> Self {
        self.severity_text = Some(text.into());
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<AnyValue>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Append attributes.
    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = KeyValue>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// Override the correlation taken from the current context.
    pub fn with_trace_context(mut self, trace_context: Option<TraceContext>) -> Self {
        self.trace_context = trace_context;
        self
    }

    /// Limits applied at build time; defaults to [`AttributeLimits::default`].
    pub fn with_limits(mut self, limits: AttributeLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Finish the record.
    pub fn build(self, resource: Arc<Resource>, scope: Arc<InstrumentationScope>) -> LogRecord {
        let (attributes, dropped_attributes_count) =
            self.limits.unwrap_or_default().apply(self.attributes);
        LogRecord {
            event_name: self.event_name,
            timestamp: self.timestamp,
            observed_timestamp: SystemTime::now(),
            trace_context: self.trace_context,
            severity_text: self.severity_text,
            severity_number: self.severity_number,
            body: self.body,
            attributes,
            dropped_attributes_count,
            resource,
            scope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SpanContext;

    fn build(builder: LogRecordBuilder) -> LogRecord {
        builder.build(
            Arc::new(Resource::empty()),
            InstrumentationScope::builder("test").build_shared(),
        )
    }

    #[test]
    fn correlates_with_active_span() {
        let active = SpanContext::new(TraceId::from(9_u128), SpanId::from(3), TraceFlags::SAMPLED);
        let record = {
            let _guard = Context::current().with_span(active.clone()).attach();
            build(LogRecord::builder().with_body("in span"))
        };
        let trace_context = record.trace_context.unwrap();
        assert_eq!(trace_context.trace_id, active.trace_id);
        assert_eq!(trace_context.span_id, active.span_id);

        let outside = build(LogRecord::builder());
        assert!(outside.trace_context.is_none());
    }

    #[test]
    fn severity_sets_default_text() {
        let record = build(LogRecord::builder().with_severity(Severity::Warn3));
        assert_eq!(record.severity_number, Some(Severity::Warn3));
        assert_eq!(record.severity_text.as_deref(), Some("WARN"));

        let custom = build(
            LogRecord::builder()
                .with_severity_text("warning")
                .with_severity(Severity::Warn),
        );
        assert_eq!(custom.severity_text.as_deref(), Some("warning"));
    }
}
