//! Serializes batches into OTLP export requests.
use crate::proto::collector::{ExportPartialSuccess, ExportServiceResponse};
use crate::transform::{logs::logs_request, metrics::metrics_request, trace::trace_request};
use crate::transport::ExportRequest;
use otel_pipeline_sdk::record::Record;
use otel_pipeline_sdk::Signal;
use prost::Message;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// MIME type of protobuf payloads.
pub const CONTENT_TYPE_PROTOBUF: &str = "application/x-protobuf";
/// MIME type of JSON payloads.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Wire protocol, which also fixes the payload encoding.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Protocol {
    /// gRPC with protobuf payloads.
    Grpc,
    /// HTTP with protobuf payloads.
    #[default]
    HttpBinary,
    /// HTTP with JSON payloads.
    HttpJson,
}

impl Protocol {
    /// Whether this protocol travels over plain HTTP.
    pub fn is_http(&self) -> bool {
        matches!(self, Protocol::HttpBinary | Protocol::HttpJson)
    }

    /// Content type of request bodies.
    pub fn content_type(&self) -> &'static str {
        match self {
            Protocol::Grpc | Protocol::HttpBinary => CONTENT_TYPE_PROTOBUF,
            Protocol::HttpJson => CONTENT_TYPE_JSON,
        }
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Grpc => f.write_str("grpc"),
            Protocol::HttpBinary => f.write_str("http/protobuf"),
            Protocol::HttpJson => f.write_str("http/json"),
        }
    }
}

impl FromStr for Protocol {
    type Err = UnknownProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "grpc" => Ok(Protocol::Grpc),
            "http/protobuf" => Ok(Protocol::HttpBinary),
            "http/json" => Ok(Protocol::HttpJson),
            other => Err(UnknownProtocol(other.to_string())),
        }
    }
}

/// A protocol name other than `grpc`, `http/protobuf` or `http/json`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown OTLP protocol '{0}'")]
pub struct UnknownProtocol(pub String);

/// Serializing a whole request failed.
///
/// Individual attributes that cannot be represented never cause this; they
/// are dropped during conversion.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EncodeError {
    /// JSON serialization failed.
    #[error("failed to serialize {signal} request as JSON: {source}")]
    Json {
        /// Signal being encoded.
        signal: Signal,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// Turns records into request bodies for one [`Protocol`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Encoder {
    protocol: Protocol,
}

impl Encoder {
    /// Encoder for `protocol`.
    pub fn new(protocol: Protocol) -> Self {
        Encoder { protocol }
    }

    /// The protocol this encoder serves.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Encode the records of `signal` found in `records`, grouped by
    /// resource and scope. Records of other signals are skipped.
    pub fn encode(&self, signal: Signal, records: &[Record]) -> Result<ExportRequest, EncodeError> {
        match signal {
            Signal::Traces => self.serialize(
                signal,
                &trace_request(records.iter().filter_map(|r| match r {
                    Record::Span(span) => Some(span),
                    _ => None,
                })),
            ),
            Signal::Logs => self.serialize(
                signal,
                &logs_request(records.iter().filter_map(|r| match r {
                    Record::Log(log) => Some(log),
                    _ => None,
                })),
            ),
            Signal::Metrics => self.serialize(
                signal,
                &metrics_request(records.iter().filter_map(|r| match r {
                    Record::Metric(point) => Some(point),
                    _ => None,
                })),
            ),
        }
    }

    fn serialize<M: Message + Serialize>(
        &self,
        signal: Signal,
        message: &M,
    ) -> Result<ExportRequest, EncodeError> {
        let body = match self.protocol {
            Protocol::HttpJson => serde_json::to_vec(message)
                .map_err(|source| EncodeError::Json { signal, source })?,
            Protocol::Grpc | Protocol::HttpBinary => message.encode_to_vec(),
        };
        Ok(ExportRequest {
            signal,
            body,
            content_type: self.protocol.content_type(),
        })
    }

    /// Read `partial_success` from a response body, if the server sent one.
    ///
    /// Unparsable or empty bodies yield `None`: the request was accepted and
    /// there is nothing more to report.
    pub fn decode_partial_success(&self, body: &[u8]) -> Option<ExportPartialSuccess> {
        if body.is_empty() {
            return None;
        }
        let response = match self.protocol {
            Protocol::HttpJson => serde_json::from_slice::<ExportServiceResponse>(body).ok()?,
            Protocol::Grpc | Protocol::HttpBinary => ExportServiceResponse::decode(body).ok()?,
        };
        response
            .partial_success
            .filter(|partial| partial.rejected > 0 || !partial.error_message.is_empty())
    }
}
