use super::common::{attributes, resource, scope, to_nanos};
use super::group_by_resource_and_scope;
use crate::proto::collector::ExportTraceServiceRequest;
use crate::proto::trace::{span, status, ResourceSpans, ScopeSpans, Span, Status};
use otel_pipeline_sdk::ids::SpanId;
use otel_pipeline_sdk::record::{self, SpanData, SpanKind};

fn span_kind(kind: SpanKind) -> span::SpanKind {
    match kind {
        SpanKind::Client => span::SpanKind::Client,
        SpanKind::Consumer => span::SpanKind::Consumer,
        SpanKind::Internal => span::SpanKind::Internal,
        SpanKind::Producer => span::SpanKind::Producer,
        SpanKind::Server => span::SpanKind::Server,
    }
}

fn span_status(status: &record::Status) -> Status {
    match status {
        record::Status::Unset => Status {
            code: status::StatusCode::Unset as i32,
            message: String::new(),
        },
        record::Status::Ok => Status {
            code: status::StatusCode::Ok as i32,
            message: String::new(),
        },
        record::Status::Error { description } => Status {
            code: status::StatusCode::Error as i32,
            message: description.to_string(),
        },
    }
}

fn link(link: &record::Link) -> span::Link {
    let (attributes, dropped) = attributes(&link.attributes);
    span::Link {
        trace_id: link.span_context.trace_id.to_bytes().to_vec(),
        span_id: link.span_context.span_id.to_bytes().to_vec(),
        trace_state: link.span_context.trace_state.clone(),
        attributes,
        dropped_attributes_count: link.dropped_attributes_count + dropped,
        flags: u32::from(link.span_context.trace_flags.to_u8()),
    }
}

fn event(event: &record::Event) -> span::Event {
    let (attributes, dropped) = attributes(&event.attributes);
    span::Event {
        time_unix_nano: to_nanos(event.timestamp),
        name: event.name.to_string(),
        attributes,
        dropped_attributes_count: event.dropped_attributes_count + dropped,
    }
}

pub(crate) fn span(source: &SpanData) -> Span {
    let (span_attributes, dropped) = attributes(&source.attributes);
    Span {
        trace_id: source.span_context.trace_id.to_bytes().to_vec(),
        span_id: source.span_context.span_id.to_bytes().to_vec(),
        trace_state: source.span_context.trace_state.clone(),
        parent_span_id: if source.parent_span_id != SpanId::INVALID {
            source.parent_span_id.to_bytes().to_vec()
        } else {
            vec![]
        },
        flags: u32::from(source.span_context.trace_flags.to_u8()),
        name: source.name.to_string(),
        kind: span_kind(source.span_kind) as i32,
        start_time_unix_nano: to_nanos(source.start_time),
        end_time_unix_nano: to_nanos(source.end_time),
        attributes: span_attributes,
        dropped_attributes_count: source.dropped_attributes_count + dropped,
        events: source.events.iter().map(event).collect(),
        dropped_events_count: source.dropped_events_count,
        links: source.links.iter().map(link).collect(),
        dropped_links_count: source.dropped_links_count,
        status: Some(span_status(&source.status)),
    }
}

pub(crate) fn trace_request<'a>(
    spans: impl IntoIterator<Item = &'a SpanData>,
) -> ExportTraceServiceRequest {
    let groups = group_by_resource_and_scope(
        spans
            .into_iter()
            .map(|s| (&s.resource, &s.scope, span(s))),
    );
    ExportTraceServiceRequest {
        resource_spans: groups
            .into_iter()
            .map(|group| ResourceSpans {
                resource: Some(resource(group.resource)),
                schema_url: group.resource.schema_url().unwrap_or_default().to_string(),
                scope_spans: group
                    .scopes
                    .into_iter()
                    .map(|scope_group| ScopeSpans {
                        scope: Some(scope(scope_group.scope)),
                        schema_url: scope_group.scope.schema_url().unwrap_or_default().to_string(),
                        spans: scope_group.items,
                    })
                    .collect(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otel_pipeline_sdk::ids::{SpanContext, TraceFlags, TraceId};
    use otel_pipeline_sdk::{InstrumentationScope, KeyValue, Resource};
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn span_fields_map_onto_the_wire_message() {
        let parent = SpanContext::new(TraceId::from(1_u128), SpanId::from(2), TraceFlags::SAMPLED);
        let start = UNIX_EPOCH + Duration::from_secs(10);
        let data = SpanData::builder("GET /orders")
            .with_parent(Some(parent))
            .with_kind(SpanKind::Server)
            .with_times(start, start + Duration::from_millis(5))
            .with_status(record::Status::error("boom"))
            .with_attributes([KeyValue::new("http.status", 500_i64), KeyValue::new("", 1_i64)])
            .build(
                Arc::new(Resource::empty()),
                InstrumentationScope::builder("web").build_shared(),
            );

        let encoded = span(&data);
        assert_eq!(encoded.trace_id, TraceId::from(1_u128).to_bytes().to_vec());
        assert_eq!(encoded.parent_span_id, SpanId::from(2).to_bytes().to_vec());
        assert_eq!(encoded.kind, span::SpanKind::Server as i32);
        assert_eq!(encoded.start_time_unix_nano, 10_000_000_000);
        assert_eq!(encoded.end_time_unix_nano, 10_005_000_000);
        assert_eq!(encoded.flags, 1);
        assert_eq!(encoded.attributes.len(), 1);
        assert_eq!(encoded.dropped_attributes_count, 1);
        let status = encoded.status.unwrap();
        assert_eq!(status.code, status::StatusCode::Error as i32);
        assert_eq!(status.message, "boom");
    }

    #[test]
    fn root_span_has_no_parent_id() {
        let data = SpanData::builder("root").with_parent(None).build(
            Arc::new(Resource::empty()),
            InstrumentationScope::builder("web").build_shared(),
        );
        assert!(span(&data).parent_span_id.is_empty());
    }
}
