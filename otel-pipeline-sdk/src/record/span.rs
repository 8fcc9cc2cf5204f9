use crate::common::{AttributeLimits, KeyValue};
use crate::context::Context;
use crate::ids::{RandomIdGenerator, SpanContext, SpanId, TraceFlags};
use crate::resource::{InstrumentationScope, Resource};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::SystemTime;

/// Role of a span in a trace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// Internal operation, the default.
    #[default]
    Internal,
    /// Server side of a synchronous request.
    Server,
    /// Client side of a synchronous request.
    Client,
    /// Initiator of an asynchronous request.
    Producer,
    /// Receiver of an asynchronous request.
    Consumer,
}

/// Outcome of the operation a span covers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Status {
    /// No status was set.
    #[default]
    Unset,
    /// The operation failed.
    Error {
        /// Human readable description of the failure.
        description: Cow<'static, str>,
    },
    /// The operation succeeded.
    Ok,
}

impl Status {
    /// An error status with `description`.
    pub fn error(description: impl Into<Cow<'static, str>>) -> Self {
        Status::Error {
            description: description.into(),
        }
    }
}

/// A timestamped annotation on a span.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Event name
    pub name: Cow<'static, str>,
    /// When the event happened
    pub timestamp: SystemTime,
    /// Event attributes
    pub attributes: Vec<KeyValue>,
    /// Attributes removed by limits
    pub dropped_attributes_count: u32,
}

impl Event {
    /// Create an event.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        timestamp: SystemTime,
        attributes: Vec<KeyValue>,
        dropped_attributes_count: u32,
    ) -> Self {
        Event {
            name: name.into(),
            timestamp,
            attributes,
            dropped_attributes_count,
        }
    }
}

/// A pointer from this span to another span.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    /// The linked span
    pub span_context: SpanContext,
    /// Link attributes
    pub attributes: Vec<KeyValue>,
    /// Attributes removed by limits
    pub dropped_attributes_count: u32,
}

/// A finished span.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanData {
    /// Exportable `SpanContext`
    pub span_context: SpanContext,
    /// Span parent id, `SpanId::INVALID` for root spans
    pub parent_span_id: SpanId,
    /// Span kind
    pub span_kind: SpanKind,
    /// Span name
    pub name: Cow<'static, str>,
    /// Span start time
    pub start_time: SystemTime,
    /// Span end time
    pub end_time: SystemTime,
    /// Span attributes
    pub attributes: Vec<KeyValue>,
    /// The number of attributes that were above the configured limit, and thus dropped.
    pub dropped_attributes_count: u32,
    /// Span events
    pub events: Vec<Event>,
    /// Events removed by limits
    pub dropped_events_count: u32,
    /// Span Links
    pub links: Vec<Link>,
    /// Links removed by limits
    pub dropped_links_count: u32,
    /// Span status
    pub status: Status,
    /// Resource the span was produced by
    pub resource: Arc<Resource>,
    /// Instrumentation scope that produced this span
    pub scope: Arc<InstrumentationScope>,
}

impl SpanData {
    /// Start building a span named `name`.
    ///
    /// If the current [`Context`] has an active span, the built span becomes
    /// its child.
    pub fn builder(name: impl Into<Cow<'static, str>>) -> SpanDataBuilder {
        SpanDataBuilder {
            name: name.into(),
            span_context: None,
            parent: Context::current_span(),
            span_kind: SpanKind::Internal,
            start_time: None,
            end_time: None,
            attributes: Vec::new(),
            events: Vec::new(),
            links: Vec::new(),
            status: Status::Unset,
            limits: None,
        }
    }
}

/// Builder for [`SpanData`].
#[derive(Debug)]
pub struct SpanDataBuilder {
    name: Cow<'static, str>,
    span_context: Option<SpanContext>,
    parent: Option<SpanContext>,
    span_kind: SpanKind,
    start_time: Option<SystemTime>,
    end_time: Option<SystemTime>,
    attributes: Vec<KeyValue>,
    events: Vec<Event>,
    links: Vec<Link>,
    status: Status,
    limits: Option<AttributeLimits>,
}

impl SpanDataBuilder {
    /// Use explicit ids instead of generated ones.
    pub fn with_span_context(mut self, span_context: SpanContext) -> Self {
        self.span_context = Some(span_context);
        self
    }

    /// Override the parent taken from the current context.
    pub fn with_parent(mut self, parent: Option<SpanContext>) -> Self {
        self.parent = parent;
        self
    }

    /// Set the span kind.
    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.span_kind = kind;
        self
    }

    /// Set start and end time.
    pub fn with_times(mut self, start: SystemTime, end: SystemTime) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// Append attributes.
    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = KeyValue>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// Append an event.
    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    /// Append a link.
    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Limits applied at build time; defaults to [`AttributeLimits::default`].
    pub fn with_limits(mut self, limits: AttributeLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Finish the span.
    pub fn build(self, resource: Arc<Resource>, scope: Arc<InstrumentationScope>) -> SpanData {
        let limits = self.limits.unwrap_or_default();
        let ids = RandomIdGenerator::default();
        let span_context = self.span_context.unwrap_or_else(|| match &self.parent {
            Some(parent) => SpanContext {
                span_id: ids.new_span_id(),
                ..parent.clone()
            },
            None => SpanContext::new(ids.new_trace_id(), ids.new_span_id(), TraceFlags::SAMPLED),
        });
        let now = SystemTime::now();
        let (attributes, dropped_attributes_count) = limits.apply(self.attributes);
        let events = self
            .events
            .into_iter()
            .map(|mut event| {
                let (kept, dropped) = limits.apply(std::mem::take(&mut event.attributes));
                event.attributes = kept;
                event.dropped_attributes_count += dropped;
                event
            })
            .collect();

        SpanData {
            span_context,
            parent_span_id: self.parent.map(|p| p.span_id).unwrap_or(SpanId::INVALID),
            span_kind: self.span_kind,
            name: self.name,
            start_time: self.start_time.unwrap_or(now),
            end_time: self.end_time.unwrap_or(now),
            attributes,
            dropped_attributes_count,
            events,
            dropped_events_count: 0,
            links: self.links,
            dropped_links_count: 0,
            status: self.status,
            resource,
            scope,
        }
    }
}
