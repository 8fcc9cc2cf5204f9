//! `opentelemetry.proto.collector.{trace,metrics,logs}.v1` request and response envelopes.
use super::logs::ResourceLogs;
use super::metrics::ResourceMetrics;
use super::trace::ResourceSpans;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct ExportTraceServiceRequest {
    #[prost(message, repeated, tag = "1")]
    pub resource_spans: Vec<ResourceSpans>,
}

#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetricsServiceRequest {
    #[prost(message, repeated, tag = "1")]
    pub resource_metrics: Vec<ResourceMetrics>,
}

#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct ExportLogsServiceRequest {
    #[prost(message, repeated, tag = "1")]
    pub resource_logs: Vec<ResourceLogs>,
}

/// Response shared by the three export services.
///
/// The services differ only in the name of the rejected counter, which is
/// always field 1 of `partial_success`, so a single message decodes all three.
#[derive(Deserialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportServiceResponse {
    #[prost(message, optional, tag = "1")]
    pub partial_success: Option<ExportPartialSuccess>,
}

/// Details of a request the server accepted only in part.
#[derive(Deserialize, Clone, PartialEq, ::prost::Message)]
#[serde(default)]
pub struct ExportPartialSuccess {
    /// Number of spans, data points or log records the server rejected.
    #[prost(int64, tag = "1")]
    #[serde(
        alias = "rejectedSpans",
        alias = "rejectedDataPoints",
        alias = "rejectedLogRecords",
        deserialize_with = "crate::proto::serializers::deserialize_i64_from_string_or_number"
    )]
    pub rejected: i64,
    #[prost(string, tag = "2")]
    #[serde(rename = "errorMessage")]
    pub error_message: String,
}
