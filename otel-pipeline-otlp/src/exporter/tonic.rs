//! OTLP/gRPC transport over tonic.
//!
//! Payloads arrive already encoded, so the channel carries raw bytes through
//! a pass-through codec. Calls are driven by a private current-thread
//! runtime. A `send` from a thread that drives another runtime is moved to a
//! helper thread.
use super::{block_outside_runtime, Compression, ExporterBuildError, SignalConfig, SignalConfigs, TlsMaterial};
use crate::retry_classification::grpc::classify_tonic_status;
use crate::transport::{ExportRequest, ExportResponse, TransportClient, TransportError};
use bytes::{Buf, BufMut, Bytes};
use http::uri::PathAndQuery;
use otel_pipeline_sdk::Signal;
use std::sync::Mutex;
use std::time::Duration;
use tokio::runtime::Runtime;
use tonic::codec::{Codec, CompressionEncoding, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::metadata::MetadataMap;
use tonic::transport::{Channel, Endpoint};
use tonic::Status;

const TRACES_PATH: &str = "/opentelemetry.proto.collector.trace.v1.TraceService/Export";
const METRICS_PATH: &str = "/opentelemetry.proto.collector.metrics.v1.MetricsService/Export";
const LOGS_PATH: &str = "/opentelemetry.proto.collector.logs.v1.LogsService/Export";

fn export_path(signal: Signal) -> PathAndQuery {
    PathAndQuery::from_static(match signal {
        Signal::Traces => TRACES_PATH,
        Signal::Metrics => METRICS_PATH,
        Signal::Logs => LOGS_PATH,
    })
}

#[derive(Debug)]
struct SignalChannel {
    channel: Channel,
    metadata: MetadataMap,
    timeout: Duration,
    compression: Option<Compression>,
}

impl SignalChannel {
    /// Must run inside the transport's runtime context.
    fn connect(config: SignalConfig) -> Result<Self, ExporterBuildError> {
        let SignalConfig {
            endpoint: uri,
            mut headers,
            timeout,
            compression,
            tls,
        } = config;
        let is_https = uri.scheme_str() == Some("https");
        // tonic strips `user-agent` from metadata; it belongs on the endpoint.
        let user_agent = headers.remove(http::header::USER_AGENT);

        let mut endpoint = Endpoint::from(uri).timeout(timeout);
        if let Some(user_agent) = user_agent {
            endpoint = endpoint
                .user_agent(user_agent)
                .map_err(|err| ExporterBuildError::InvalidConfig {
                    name: "user-agent".into(),
                    reason: err.to_string(),
                })?;
        }
        endpoint = with_tls(endpoint, is_https, &tls)?;

        Ok(SignalChannel {
            channel: endpoint.connect_lazy(),
            metadata: MetadataMap::from_headers(headers),
            timeout,
            compression,
        })
    }
}

#[cfg(feature = "tls")]
fn with_tls(
    endpoint: Endpoint,
    is_https: bool,
    tls: &TlsMaterial,
) -> Result<Endpoint, ExporterBuildError> {
    use tonic::transport::{Certificate, ClientTlsConfig, Identity};

    if !is_https && tls.ca_certificate.is_none() && tls.identity.is_none() {
        return Ok(endpoint);
    }
    let mut tls_config = ClientTlsConfig::new().with_webpki_roots();
    if let Some(pem) = &tls.ca_certificate {
        tls_config = tls_config.ca_certificate(Certificate::from_pem(pem));
    }
    if let Some((cert, key)) = &tls.identity {
        tls_config = tls_config.identity(Identity::from_pem(cert, key));
    }
    endpoint
        .tls_config(tls_config)
        .map_err(|err| ExporterBuildError::InvalidConfig {
            name: "tls".into(),
            reason: err.to_string(),
        })
}

#[cfg(not(feature = "tls"))]
fn with_tls(
    endpoint: Endpoint,
    is_https: bool,
    _tls: &TlsMaterial,
) -> Result<Endpoint, ExporterBuildError> {
    if is_https {
        return Err(ExporterBuildError::InvalidConfig {
            name: "endpoint".into(),
            reason: "the `tls` feature is required for https endpoints".into(),
        });
    }
    Ok(endpoint)
}

#[derive(Debug)]
pub(crate) struct TonicTransport {
    runtime: Mutex<Option<Runtime>>,
    traces: SignalChannel,
    metrics: SignalChannel,
    logs: SignalChannel,
}

impl TonicTransport {
    pub(crate) fn new(signals: SignalConfigs) -> Result<Self, ExporterBuildError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| {
                ExporterBuildError::InternalFailure(format!("cannot start gRPC runtime: {err}"))
            })?;

        let (traces, metrics, logs) = {
            let _guard = runtime.enter();
            (
                SignalChannel::connect(signals.traces)?,
                SignalChannel::connect(signals.metrics)?,
                SignalChannel::connect(signals.logs)?,
            )
        };

        Ok(TonicTransport {
            runtime: Mutex::new(Some(runtime)),
            traces,
            metrics,
            logs,
        })
    }

    fn channel(&self, signal: Signal) -> &SignalChannel {
        match signal {
            Signal::Traces => &self.traces,
            Signal::Metrics => &self.metrics,
            Signal::Logs => &self.logs,
        }
    }
}

impl TransportClient for TonicTransport {
    fn send(&self, request: &ExportRequest) -> Result<ExportResponse, TransportError> {
        let runtime = self
            .runtime
            .lock()
            .map_err(|_| TransportError::non_retryable("gRPC runtime lock poisoned"))?;
        let runtime = runtime
            .as_ref()
            .ok_or_else(|| TransportError::non_retryable("gRPC transport is shut down"))?;
        let target = self.channel(request.signal);

        let mut grpc = tonic::client::Grpc::new(target.channel.clone());
        if let Some(Compression::Gzip) = target.compression {
            grpc = grpc
                .send_compressed(CompressionEncoding::Gzip)
                .accept_compressed(CompressionEncoding::Gzip);
        }
        let mut message = tonic::Request::new(Bytes::from(request.body.clone()));
        *message.metadata_mut() = target.metadata.clone();
        message.set_timeout(target.timeout);
        let path = export_path(request.signal);

        block_outside_runtime(move || {
            let result: Result<tonic::Response<Bytes>, Status> = runtime.block_on(async move {
                grpc.ready()
                    .await
                    .map_err(|err| Status::unavailable(err.to_string()))?;
                grpc.unary(message, path, RawCodec).await
            });
            match result {
                Ok(response) => Ok(ExportResponse {
                    body: response.into_inner().to_vec(),
                }),
                Err(status) => Err(TransportError {
                    kind: classify_tonic_status(&status),
                    message: format!(
                        "gRPC export failed with {:?}: {}",
                        status.code(),
                        status.message()
                    ),
                }),
            }
        })
    }

    fn shutdown(&self) {
        if let Ok(mut runtime) = self.runtime.lock() {
            if let Some(runtime) = runtime.take() {
                runtime.shutdown_background();
            }
        }
    }
}

impl Drop for TonicTransport {
    fn drop(&mut self) {
        // Dropping a runtime from async code panics; a background shutdown
        // does not.
        self.shutdown();
    }
}

/// Passes already serialized protobuf through unchanged.
#[derive(Clone, Copy, Debug, Default)]
struct RawCodec;

impl Codec for RawCodec {
    type Encode = Bytes;
    type Decode = Bytes;
    type Encoder = RawCodec;
    type Decoder = RawCodec;

    fn encoder(&mut self) -> Self::Encoder {
        RawCodec
    }

    fn decoder(&mut self) -> Self::Decoder {
        RawCodec
    }
}

impl Encoder for RawCodec {
    type Item = Bytes;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        dst.put_slice(&item);
        Ok(())
    }
}

impl Decoder for RawCodec {
    type Item = Bytes;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        Ok(Some(src.copy_to_bytes(src.remaining())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Protocol;
    use crate::exporter::tests::run_env_test;
    use crate::exporter::ExportConfig;

    fn transport(endpoint: &str) -> TonicTransport {
        let config = ExportConfig {
            protocol: Some(Protocol::Grpc),
            endpoint: Some(endpoint.into()),
            timeout: Some(Duration::from_millis(500)),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        TonicTransport::new(config.signals).unwrap()
    }

    #[test]
    fn export_paths_name_the_collector_services() {
        assert_eq!(export_path(Signal::Traces).path(), TRACES_PATH);
        assert_eq!(export_path(Signal::Metrics).path(), METRICS_PATH);
        assert_eq!(export_path(Signal::Logs).path(), LOGS_PATH);
    }

    #[test]
    fn unreachable_collector_fails_and_shutdown_is_final() {
        run_env_test(vec![], || {
            // Nothing listens on port 1.
            let transport = transport("http://127.0.0.1:1");
            let request = ExportRequest {
                signal: Signal::Logs,
                body: Vec::new(),
                content_type: crate::encoder::CONTENT_TYPE_PROTOBUF,
            };
            assert!(transport.send(&request).is_err());

            transport.shutdown();
            let err = transport.send(&request).unwrap_err();
            assert_eq!(err.kind, crate::retry::RetryErrorType::NonRetryable);
        });
    }

    #[test]
    fn send_from_inside_a_runtime_does_not_panic() {
        run_env_test(vec![], || {
            let transport = transport("http://127.0.0.1:1");
            let request = ExportRequest {
                signal: Signal::Traces,
                body: Vec::new(),
                content_type: crate::encoder::CONTENT_TYPE_PROTOBUF,
            };
            let app_runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let result = app_runtime.block_on(async { transport.send(&request) });
            assert!(result.is_err());
        });
    }
}
