//! A reduced OTLP v1 schema: the messages this crate sends and the response
//! it reads back.
//!
//! The structs carry prost attributes with the upstream field tags for the
//! protobuf encoding, and serde attributes implementing the OTLP/JSON mapping.
#![allow(missing_docs)]

pub mod collector;
pub mod common;
pub mod logs;
pub mod metrics;
pub mod resource;
pub(crate) mod serializers;
pub mod trace;
