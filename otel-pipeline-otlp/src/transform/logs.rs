use super::common::{any_value, attributes, resource, scope, to_nanos};
use super::group_by_resource_and_scope;
use crate::proto::collector::ExportLogsServiceRequest;
use crate::proto::logs::{LogRecord, ResourceLogs, ScopeLogs, SeverityNumber};
use otel_pipeline_sdk::record::LogRecord as SdkLogRecord;

pub(crate) fn log_record(source: &SdkLogRecord) -> LogRecord {
    let (log_attributes, dropped) = attributes(&source.attributes);
    let trace_context = source.trace_context.as_ref();
    LogRecord {
        time_unix_nano: source.timestamp.map(to_nanos).unwrap_or_default(),
        observed_time_unix_nano: to_nanos(source.observed_timestamp),
        severity_number: source
            .severity_number
            .map(|severity| severity as i32)
            .unwrap_or(SeverityNumber::Unspecified as i32),
        severity_text: source
            .severity_text
            .as_deref()
            .unwrap_or_default()
            .to_string(),
        body: source.body.as_ref().map(any_value),
        attributes: log_attributes,
        dropped_attributes_count: source.dropped_attributes_count + dropped,
        flags: trace_context
            .and_then(|ctx| ctx.trace_flags)
            .map(|flags| u32::from(flags.to_u8()))
            .unwrap_or_default(),
        trace_id: trace_context
            .map(|ctx| ctx.trace_id.to_bytes().to_vec())
            .unwrap_or_default(),
        span_id: trace_context
            .map(|ctx| ctx.span_id.to_bytes().to_vec())
            .unwrap_or_default(),
        event_name: source.event_name.as_deref().unwrap_or_default().to_string(),
    }
}

pub(crate) fn logs_request<'a>(
    records: impl IntoIterator<Item = &'a SdkLogRecord>,
) -> ExportLogsServiceRequest {
    let groups = group_by_resource_and_scope(
        records
            .into_iter()
            .map(|r| (&r.resource, &r.scope, log_record(r))),
    );
    ExportLogsServiceRequest {
        resource_logs: groups
            .into_iter()
            .map(|group| ResourceLogs {
                resource: Some(resource(group.resource)),
                schema_url: group.resource.schema_url().unwrap_or_default().to_string(),
                scope_logs: group
                    .scopes
                    .into_iter()
                    .map(|scope_group| ScopeLogs {
                        scope: Some(scope(scope_group.scope)),
                        schema_url: scope_group.scope.schema_url().unwrap_or_default().to_string(),
                        log_records: scope_group.items,
                    })
                    .collect(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otel_pipeline_sdk::ids::{SpanId, TraceFlags, TraceId};
    use otel_pipeline_sdk::record::{Severity, TraceContext};
    use otel_pipeline_sdk::{InstrumentationScope, Resource};
    use std::sync::Arc;

    #[test]
    fn log_fields_map_onto_the_wire_message() {
        let record = SdkLogRecord::builder()
            .with_severity(Severity::Error)
            .with_event_name("checkout.failed")
            .with_body("payment declined")
            .with_trace_context(Some(TraceContext {
                trace_id: TraceId::from(5_u128),
                span_id: SpanId::from(6),
                trace_flags: Some(TraceFlags::SAMPLED),
            }))
            .build(
                Arc::new(Resource::empty()),
                InstrumentationScope::builder("shop").build_shared(),
            );

        let encoded = log_record(&record);
        assert_eq!(encoded.severity_number, SeverityNumber::Error as i32);
        assert_eq!(encoded.severity_text, "ERROR");
        assert_eq!(encoded.event_name, "checkout.failed");
        assert_eq!(encoded.time_unix_nano, 0);
        assert!(encoded.observed_time_unix_nano > 0);
        assert_eq!(encoded.span_id, SpanId::from(6).to_bytes().to_vec());
        assert_eq!(encoded.flags, 1);
        assert!(encoded.body.is_some());
    }

    #[test]
    fn uncorrelated_record_has_empty_ids() {
        let record = SdkLogRecord::builder().with_trace_context(None).build(
            Arc::new(Resource::empty()),
            InstrumentationScope::builder("shop").build_shared(),
        );
        let encoded = log_record(&record);
        assert!(encoded.trace_id.is_empty());
        assert!(encoded.span_id.is_empty());
        assert_eq!(encoded.severity_number, 0);
    }
}
