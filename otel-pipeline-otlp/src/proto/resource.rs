//! `opentelemetry.proto.resource.v1`
use super::common::KeyValue;
use serde::Serialize;

/// Resource information.
#[derive(Serialize, Clone, PartialEq, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Set of attributes that describe the resource.
    #[prost(message, repeated, tag = "1")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
    /// The number of dropped attributes. If the value is 0, then no attributes were dropped.
    #[prost(uint32, tag = "2")]
    pub dropped_attributes_count: u32,
}
