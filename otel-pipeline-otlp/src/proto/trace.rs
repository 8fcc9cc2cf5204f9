//! `opentelemetry.proto.trace.v1`
use super::common::{InstrumentationScope, KeyValue};
use super::resource::Resource;
use serde::Serialize;

/// A collection of ScopeSpans from a Resource.
#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpans {
    /// The resource for the spans in this message.
    /// If this field is not set then no resource info is known.
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
    /// A list of ScopeSpans that originate from a resource.
    #[prost(message, repeated, tag = "2")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scope_spans: Vec<ScopeSpans>,
    /// The Schema URL of the resource.
    #[prost(string, tag = "3")]
    pub schema_url: String,
}

/// A collection of Spans produced by an InstrumentationScope.
#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSpans {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<InstrumentationScope>,
    #[prost(message, repeated, tag = "2")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<Span>,
    #[prost(string, tag = "3")]
    pub schema_url: String,
}

/// A Span represents a single operation performed by a single component of the system.
#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    /// A unique identifier for a trace. 16 bytes, all zeroes is invalid.
    #[prost(bytes = "vec", tag = "1")]
    #[serde(serialize_with = "crate::proto::serializers::serialize_to_hex_string")]
    pub trace_id: Vec<u8>,
    /// A unique identifier for a span within a trace. 8 bytes, all zeroes is invalid.
    #[prost(bytes = "vec", tag = "2")]
    #[serde(serialize_with = "crate::proto::serializers::serialize_to_hex_string")]
    pub span_id: Vec<u8>,
    /// W3C trace-context tracestate.
    #[prost(string, tag = "3")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub trace_state: String,
    /// Empty for root spans.
    #[prost(bytes = "vec", tag = "4")]
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "crate::proto::serializers::serialize_to_hex_string"
    )]
    pub parent_span_id: Vec<u8>,
    /// W3C trace flags in the low 8 bits.
    #[prost(fixed32, tag = "16")]
    pub flags: u32,
    #[prost(string, tag = "5")]
    pub name: String,
    #[prost(enumeration = "span::SpanKind", tag = "6")]
    pub kind: i32,
    #[prost(fixed64, tag = "7")]
    #[serde(serialize_with = "crate::proto::serializers::serialize_u64_to_string")]
    pub start_time_unix_nano: u64,
    #[prost(fixed64, tag = "8")]
    #[serde(serialize_with = "crate::proto::serializers::serialize_u64_to_string")]
    pub end_time_unix_nano: u64,
    #[prost(message, repeated, tag = "9")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
    #[prost(uint32, tag = "10")]
    pub dropped_attributes_count: u32,
    #[prost(message, repeated, tag = "11")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<span::Event>,
    #[prost(uint32, tag = "12")]
    pub dropped_events_count: u32,
    #[prost(message, repeated, tag = "13")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<span::Link>,
    #[prost(uint32, tag = "14")]
    pub dropped_links_count: u32,
    #[prost(message, optional, tag = "15")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

/// Nested message and enum types in `Span`.
pub mod span {
    use super::KeyValue;
    use serde::Serialize;

    /// A time-stamped annotation of the span.
    #[derive(Serialize, Clone, PartialEq, ::prost::Message)]
    #[serde(rename_all = "camelCase")]
    pub struct Event {
        #[prost(fixed64, tag = "1")]
        #[serde(serialize_with = "crate::proto::serializers::serialize_u64_to_string")]
        pub time_unix_nano: u64,
        #[prost(string, tag = "2")]
        pub name: String,
        #[prost(message, repeated, tag = "3")]
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub attributes: Vec<KeyValue>,
        #[prost(uint32, tag = "4")]
        pub dropped_attributes_count: u32,
    }

    /// A pointer from the current span to another span.
    #[derive(Serialize, Clone, PartialEq, ::prost::Message)]
    #[serde(rename_all = "camelCase")]
    pub struct Link {
        #[prost(bytes = "vec", tag = "1")]
        #[serde(serialize_with = "crate::proto::serializers::serialize_to_hex_string")]
        pub trace_id: Vec<u8>,
        #[prost(bytes = "vec", tag = "2")]
        #[serde(serialize_with = "crate::proto::serializers::serialize_to_hex_string")]
        pub span_id: Vec<u8>,
        #[prost(string, tag = "3")]
        #[serde(skip_serializing_if = "String::is_empty")]
        pub trace_state: String,
        #[prost(message, repeated, tag = "4")]
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub attributes: Vec<KeyValue>,
        #[prost(uint32, tag = "5")]
        pub dropped_attributes_count: u32,
        #[prost(fixed32, tag = "6")]
        pub flags: u32,
    }

    /// SpanKind is the type of span.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum SpanKind {
        Unspecified = 0,
        Internal = 1,
        Server = 2,
        Client = 3,
        Producer = 4,
        Consumer = 5,
    }
}

/// The Status type defines a logical error model.
#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// A developer-facing human readable error message.
    #[prost(string, tag = "2")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[prost(enumeration = "status::StatusCode", tag = "3")]
    pub code: i32,
}

/// Nested message and enum types in `Status`.
pub mod status {
    /// The status code.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum StatusCode {
        Unset = 0,
        Ok = 1,
        Error = 2,
    }
}
