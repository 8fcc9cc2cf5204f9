//! `opentelemetry.proto.common.v1`
use serde::Serialize;

/// AnyValue is used to represent any type of attribute value. AnyValue may contain a
/// primitive value such as a string or integer or it may contain an arbitrary nested
/// object containing arrays, key-value lists and primitives.
#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct AnyValue {
    /// The value is one of the listed fields. It is valid for all values to be unspecified
    /// in which case this AnyValue is considered to be "empty".
    #[prost(oneof = "any_value::Value", tags = "1, 2, 3, 4, 5, 6, 7")]
    #[serde(flatten)]
    pub value: Option<any_value::Value>,
}

/// Nested message and enum types in `AnyValue`.
pub mod any_value {
    use serde::Serialize;

    /// The value is one of the listed fields.
    #[derive(Serialize, Clone, PartialEq, ::prost::Oneof)]
    #[serde(rename_all = "camelCase")]
    pub enum Value {
        #[prost(string, tag = "1")]
        StringValue(String),
        #[prost(bool, tag = "2")]
        BoolValue(bool),
        #[prost(int64, tag = "3")]
        #[serde(serialize_with = "crate::proto::serializers::serialize_i64_to_string")]
        IntValue(i64),
        #[prost(double, tag = "4")]
        #[serde(serialize_with = "crate::proto::serializers::serialize_f64")]
        DoubleValue(f64),
        #[prost(message, tag = "5")]
        ArrayValue(super::ArrayValue),
        #[prost(message, tag = "6")]
        KvlistValue(super::KeyValueList),
        #[prost(bytes = "vec", tag = "7")]
        #[serde(serialize_with = "crate::proto::serializers::serialize_to_base64")]
        BytesValue(Vec<u8>),
    }
}

/// ArrayValue is a list of AnyValue messages.
#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct ArrayValue {
    /// Array of values. The array may be empty (contain 0 elements).
    #[prost(message, repeated, tag = "1")]
    pub values: Vec<AnyValue>,
}

/// KeyValueList is a list of KeyValue messages. Duplicate keys are not allowed.
#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct KeyValueList {
    #[prost(message, repeated, tag = "1")]
    pub values: Vec<KeyValue>,
}

/// KeyValue is a key-value pair that is used to store Span attributes, Link
/// attributes, etc.
#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct KeyValue {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<AnyValue>,
}

/// InstrumentationScope is a message representing the instrumentation scope information
/// such as the fully qualified name and version.
#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentationScope {
    /// An empty instrumentation scope name means the name is unknown.
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub version: String,
    #[prost(message, repeated, tag = "3")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
    #[prost(uint32, tag = "4")]
    pub dropped_attributes_count: u32,
}
