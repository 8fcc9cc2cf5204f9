//! `opentelemetry.proto.metrics.v1`, limited to gauge, sum and explicit-bucket histogram.
use super::common::{InstrumentationScope, KeyValue};
use super::resource::Resource;
use serde::Serialize;

/// A collection of ScopeMetrics from a Resource.
#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetrics {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
    #[prost(message, repeated, tag = "2")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scope_metrics: Vec<ScopeMetrics>,
    #[prost(string, tag = "3")]
    pub schema_url: String,
}

/// A collection of Metrics produced by a Scope.
#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct ScopeMetrics {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<InstrumentationScope>,
    #[prost(message, repeated, tag = "2")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<Metric>,
    #[prost(string, tag = "3")]
    pub schema_url: String,
}

/// A named stream of data points of one kind.
#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[prost(string, tag = "3")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub unit: String,
    #[prost(oneof = "metric::Data", tags = "5, 7, 9")]
    #[serde(flatten)]
    pub data: Option<metric::Data>,
}

/// Nested message and enum types in `Metric`.
pub mod metric {
    use serde::Serialize;

    /// The data points of the metric.
    #[derive(Serialize, Clone, PartialEq, ::prost::Oneof)]
    #[serde(rename_all = "camelCase")]
    pub enum Data {
        #[prost(message, tag = "5")]
        Gauge(super::Gauge),
        #[prost(message, tag = "7")]
        Sum(super::Sum),
        #[prost(message, tag = "9")]
        Histogram(super::Histogram),
    }
}

/// Last sampled values.
#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct Gauge {
    #[prost(message, repeated, tag = "1")]
    pub data_points: Vec<NumberDataPoint>,
}

/// Scalar values summed over time.
#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct Sum {
    #[prost(message, repeated, tag = "1")]
    pub data_points: Vec<NumberDataPoint>,
    #[prost(enumeration = "AggregationTemporality", tag = "2")]
    pub aggregation_temporality: i32,
    #[prost(bool, tag = "3")]
    pub is_monotonic: bool,
}

/// Distributions of values in explicit buckets.
#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct Histogram {
    #[prost(message, repeated, tag = "1")]
    pub data_points: Vec<HistogramDataPoint>,
    #[prost(enumeration = "AggregationTemporality", tag = "2")]
    pub aggregation_temporality: i32,
}

/// A single scalar value of a Sum or Gauge.
#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct NumberDataPoint {
    #[prost(message, repeated, tag = "7")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
    #[prost(fixed64, tag = "2")]
    #[serde(serialize_with = "crate::proto::serializers::serialize_u64_to_string")]
    pub start_time_unix_nano: u64,
    #[prost(fixed64, tag = "3")]
    #[serde(serialize_with = "crate::proto::serializers::serialize_u64_to_string")]
    pub time_unix_nano: u64,
    #[prost(uint32, tag = "8")]
    pub flags: u32,
    #[prost(oneof = "number_data_point::Value", tags = "4, 6")]
    #[serde(flatten)]
    pub value: Option<number_data_point::Value>,
}

/// Nested message and enum types in `NumberDataPoint`.
pub mod number_data_point {
    use serde::Serialize;

    #[derive(Serialize, Clone, Copy, PartialEq, ::prost::Oneof)]
    #[serde(rename_all = "camelCase")]
    pub enum Value {
        #[prost(double, tag = "4")]
        #[serde(serialize_with = "crate::proto::serializers::serialize_f64")]
        AsDouble(f64),
        #[prost(sfixed64, tag = "6")]
        #[serde(serialize_with = "crate::proto::serializers::serialize_i64_to_string")]
        AsInt(i64),
    }
}

/// A single explicit-bucket histogram point.
///
/// `bucket_counts` has one more element than `explicit_bounds`.
#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct HistogramDataPoint {
    #[prost(message, repeated, tag = "9")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
    #[prost(fixed64, tag = "2")]
    #[serde(serialize_with = "crate::proto::serializers::serialize_u64_to_string")]
    pub start_time_unix_nano: u64,
    #[prost(fixed64, tag = "3")]
    #[serde(serialize_with = "crate::proto::serializers::serialize_u64_to_string")]
    pub time_unix_nano: u64,
    #[prost(fixed64, tag = "4")]
    #[serde(serialize_with = "crate::proto::serializers::serialize_u64_to_string")]
    pub count: u64,
    #[prost(double, optional, tag = "5")]
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "crate::proto::serializers::serialize_opt_f64"
    )]
    pub sum: Option<f64>,
    #[prost(fixed64, repeated, tag = "6")]
    #[serde(serialize_with = "crate::proto::serializers::serialize_u64_seq_to_strings")]
    pub bucket_counts: Vec<u64>,
    #[prost(double, repeated, tag = "7")]
    #[serde(serialize_with = "crate::proto::serializers::serialize_f64_seq")]
    pub explicit_bounds: Vec<f64>,
    #[prost(uint32, tag = "10")]
    pub flags: u32,
    #[prost(double, optional, tag = "11")]
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "crate::proto::serializers::serialize_opt_f64"
    )]
    pub min: Option<f64>,
    #[prost(double, optional, tag = "12")]
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "crate::proto::serializers::serialize_opt_f64"
    )]
    pub max: Option<f64>,
}

/// Whether reported values are deltas or running totals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum AggregationTemporality {
    Unspecified = 0,
    Delta = 1,
    Cumulative = 2,
}
