//! The seam between the exporter and the network.
//!
//! A [`TransportClient`] delivers one already encoded request and reports
//! how a failure should be treated. Retrying is layered on top by
//! [`RetryingClient`](crate::retry::RetryingClient), which is itself a
//! `TransportClient`.
use crate::retry::RetryErrorType;
use otel_pipeline_sdk::Signal;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// An encoded export request for one signal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportRequest {
    /// Signal the payload carries.
    pub signal: Signal,
    /// Serialized `Export*ServiceRequest`.
    pub body: Vec<u8>,
    /// MIME type of `body`.
    pub content_type: &'static str,
}

/// What the collector sent back for an accepted request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportResponse {
    /// Raw response body; may be empty.
    pub body: Vec<u8>,
}

/// A failed delivery attempt.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    /// How the retry layer treats this failure.
    pub kind: RetryErrorType,
    /// Human readable cause.
    pub message: String,
}

impl TransportError {
    /// A transient failure, worth retrying with backoff.
    pub fn retryable(message: impl Into<String>) -> Self {
        TransportError {
            kind: RetryErrorType::Retryable,
            message: message.into(),
        }
    }

    /// A permanent failure; the request is not resent.
    pub fn non_retryable(message: impl Into<String>) -> Self {
        TransportError {
            kind: RetryErrorType::NonRetryable,
            message: message.into(),
        }
    }

    /// The server asked the client to wait `delay` before retrying.
    pub fn throttled(delay: Duration, message: impl Into<String>) -> Self {
        TransportError {
            kind: RetryErrorType::Throttled(delay),
            message: message.into(),
        }
    }
}

/// Sends encoded requests to a collector.
///
/// `send` blocks the calling thread until the attempt completes or the
/// client's own timeout elapses.
pub trait TransportClient: Send + Sync + Debug {
    /// Make a single delivery attempt.
    fn send(&self, request: &ExportRequest) -> Result<ExportResponse, TransportError>;

    /// Release connections and background resources. Later sends fail.
    fn shutdown(&self) {}
}

impl<T: TransportClient + ?Sized> TransportClient for Box<T> {
    fn send(&self, request: &ExportRequest) -> Result<ExportResponse, TransportError> {
        (**self).send(request)
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }
}

impl<T: TransportClient + ?Sized> TransportClient for Arc<T> {
    fn send(&self, request: &ExportRequest) -> Result<ExportResponse, TransportError> {
        (**self).send(request)
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }
}
