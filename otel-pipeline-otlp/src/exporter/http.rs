//! OTLP/HTTP transport over a blocking reqwest client.
use super::{
    block_outside_runtime, Compression, ExporterBuildError, SignalConfig, SignalConfigs,
    TlsMaterial,
};
use crate::retry_classification::http::classify_http_error;
use crate::transport::{ExportRequest, ExportResponse, TransportClient, TransportError};
use flate2::write::GzEncoder;
use http::header::{CONTENT_ENCODING, CONTENT_TYPE, RETRY_AFTER};
use otel_pipeline_sdk::{otel_debug, Signal};
use reqwest::blocking::Client;
use std::io::Write;
use std::sync::Mutex;

/// One client per signal. Signals with the same TLS material share a client.
#[derive(Clone, Debug)]
struct SignalClients {
    traces: Client,
    metrics: Client,
    logs: Client,
}

impl SignalClients {
    fn get(&self, signal: Signal) -> &Client {
        match signal {
            Signal::Traces => &self.traces,
            Signal::Metrics => &self.metrics,
            Signal::Logs => &self.logs,
        }
    }
}

#[derive(Debug)]
pub(crate) struct HttpTransport {
    clients: Mutex<Option<SignalClients>>,
    signals: SignalConfigs,
}

impl HttpTransport {
    pub(crate) fn new(signals: SignalConfigs) -> Result<Self, ExporterBuildError> {
        let mut built: Vec<(TlsMaterial, Client)> = Vec::new();
        let mut client_for = |tls: &TlsMaterial| -> Result<Client, ExporterBuildError> {
            if let Some((_, client)) = built.iter().find(|(material, _)| material == tls) {
                return Ok(client.clone());
            }
            let client = build_client(tls)?;
            built.push((tls.clone(), client.clone()));
            Ok(client)
        };
        let clients = SignalClients {
            traces: client_for(&signals.traces.tls)?,
            metrics: client_for(&signals.metrics.tls)?,
            logs: client_for(&signals.logs.tls)?,
        };

        Ok(HttpTransport {
            clients: Mutex::new(Some(clients)),
            signals,
        })
    }
}

fn build_client(tls: &TlsMaterial) -> Result<Client, ExporterBuildError> {
    let mut builder = Client::builder();
    if let Some(pem) = &tls.ca_certificate {
        let certificate =
            reqwest::Certificate::from_pem(pem).map_err(|err| invalid_tls("certificate", err))?;
        builder = builder.add_root_certificate(certificate);
    }
    if let Some((cert, key)) = &tls.identity {
        let mut pem = cert.clone();
        pem.push(b'\n');
        pem.extend_from_slice(key);
        let identity =
            reqwest::Identity::from_pem(&pem).map_err(|err| invalid_tls("client identity", err))?;
        builder = builder.identity(identity);
    }

    // The blocking client owns a runtime and panics when built inside
    // another one, so build it on a plain thread.
    std::thread::Builder::new()
        .name("otlp-http-client-init".into())
        .spawn(move || builder.build())
        .map_err(|_| ExporterBuildError::ThreadSpawnFailed)?
        .join()
        .map_err(|_| ExporterBuildError::ThreadSpawnFailed)?
        .map_err(|err| ExporterBuildError::InternalFailure(err.to_string()))
}

fn invalid_tls(name: &str, err: reqwest::Error) -> ExporterBuildError {
    ExporterBuildError::InvalidConfig {
        name: name.to_string(),
        reason: err.to_string(),
    }
}

pub(crate) fn compress(body: &[u8], compression: Option<Compression>) -> std::io::Result<Vec<u8>> {
    match compression {
        Some(Compression::Gzip) => {
            let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(body)?;
            encoder.finish()
        }
        None => Ok(body.to_vec()),
    }
}

impl TransportClient for HttpTransport {
    fn send(&self, request: &ExportRequest) -> Result<ExportResponse, TransportError> {
        let client = self
            .clients
            .lock()
            .map_err(|_| TransportError::non_retryable("HTTP client lock poisoned"))?
            .as_ref()
            .map(|clients| clients.get(request.signal).clone())
            .ok_or_else(|| TransportError::non_retryable("HTTP client is shut down"))?;
        let config = self.signals.get(request.signal);

        let body = compress(&request.body, config.compression)
            .map_err(|err| TransportError::non_retryable(format!("compression failed: {err}")))?;
        let mut builder = client
            .post(config.endpoint.to_string())
            .headers(config.headers.clone())
            .header(CONTENT_TYPE, request.content_type)
            .timeout(config.timeout)
            .body(body);
        if let Some(compression) = config.compression {
            builder = builder.header(CONTENT_ENCODING, compression.to_string());
        }

        block_outside_runtime(move || {
            let response = builder.send().map_err(|err| {
                if err.is_builder() {
                    TransportError::non_retryable(err.to_string())
                } else {
                    TransportError::retryable(err.to_string())
                }
            })?;
            read_response(request, config, response)
        })
    }

    fn shutdown(&self) {
        if let Ok(mut clients) = self.clients.lock() {
            clients.take();
        }
    }
}

fn read_response(
    request: &ExportRequest,
    config: &SignalConfig,
    response: reqwest::blocking::Response,
) -> Result<ExportResponse, TransportError> {
    let status = response.status();
    if status.is_success() {
        let body = response
            .bytes()
            .map_err(|err| TransportError::retryable(err.to_string()))?;
        return Ok(ExportResponse { body: body.to_vec() });
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    otel_debug!(
        name: "HttpTransport.ErrorResponse",
        signal = request.signal.as_str(),
        status = status.as_u16()
    );
    Err(TransportError {
        kind: classify_http_error(status.as_u16(), retry_after.as_deref()),
        message: format!("collector returned HTTP {status} for {}", config.endpoint),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{Protocol, CONTENT_TYPE_PROTOBUF};
    use crate::exporter::tests::run_env_test;
    use crate::exporter::ExportConfig;
    use crate::retry::RetryErrorType;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use std::time::Duration;

    #[test]
    fn gzip_round_trips() {
        let payload = b"payload".repeat(64);
        let compressed = compress(&payload, Some(Compression::Gzip)).unwrap();
        assert_ne!(compressed, payload);

        let mut decoded = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, payload);
        assert_eq!(compress(&payload, None).unwrap(), payload);
    }

    #[test]
    fn send_from_inside_a_runtime_does_not_panic() {
        run_env_test(vec![], || {
            // Nothing listens on port 1.
            let config = ExportConfig {
                protocol: Some(Protocol::HttpBinary),
                endpoint: Some("http://127.0.0.1:1".into()),
                timeout: Some(Duration::from_millis(500)),
                ..Default::default()
            }
            .resolve()
            .unwrap();
            let transport = HttpTransport::new(config.signals).unwrap();
            let request = ExportRequest {
                signal: Signal::Logs,
                body: b"payload".to_vec(),
                content_type: CONTENT_TYPE_PROTOBUF,
            };

            let app_runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let result = app_runtime.block_on(async { transport.send(&request) });
            assert_eq!(result.unwrap_err().kind, RetryErrorType::Retryable);

            transport.shutdown();
            let err = transport.send(&request).unwrap_err();
            assert_eq!(err.kind, RetryErrorType::NonRetryable);
        });
    }
}
