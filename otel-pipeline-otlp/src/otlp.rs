//! The OTLP exporter: encodes each signal of a batch and ships it through a
//! retrying transport.
use crate::encoder::{Encoder, Protocol};
use crate::exporter::{Compression, ExportConfig, ExporterBuildError, ResolvedConfig};
use crate::retry::{RetryPolicy, RetryingClient};
use crate::transport::TransportClient;
use otel_pipeline_sdk::export::Exporter;
use otel_pipeline_sdk::record::Record;
use otel_pipeline_sdk::{otel_debug, otel_error, otel_warn, SdkError, SdkResult, Signal};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Distinct failure messages remembered for de-duplicated logging.
const MAX_REPORTED_ERRORS: usize = 64;

/// Builder for [`OtlpExporter`].
///
/// Unset options are taken from the `OTEL_EXPORTER_OTLP_*` environment when
/// [`build`](OtlpExporterBuilder::build) runs.
///
/// ```no_run
/// use otel_pipeline_otlp::{OtlpExporter, Protocol};
/// use std::time::Duration;
///
/// let exporter = OtlpExporter::builder()
///     .with_protocol(Protocol::HttpBinary)
///     .with_endpoint("http://collector:4318")
///     .with_timeout(Duration::from_secs(3))
///     .build()?;
/// # Ok::<(), otel_pipeline_otlp::ExporterBuildError>(())
/// ```
#[derive(Debug, Default)]
pub struct OtlpExporterBuilder {
    config: ExportConfig,
    retry_policy: RetryPolicy,
    transport: Option<Box<dyn TransportClient>>,
}

impl OtlpExporterBuilder {
    /// Wire protocol. Defaults to `OTEL_EXPORTER_OTLP_PROTOCOL`, then
    /// `http/protobuf`.
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.config.protocol = Some(protocol);
        self
    }

    /// Base collector address shared by all signals. For HTTP protocols the
    /// signal path (`/v1/traces` etc.) is appended.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into());
        self
    }

    /// Complete address for one signal, used as is.
    pub fn with_signal_endpoint(mut self, signal: Signal, endpoint: impl Into<String>) -> Self {
        self.config.signal_endpoints.insert(signal, endpoint.into());
        self
    }

    /// Additional request headers; they override headers from the environment.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.config.headers.extend(headers);
        self
    }

    /// Per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Compress payloads.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.config.compression = Some(Some(compression));
        self
    }

    /// Send payloads uncompressed whatever the environment says.
    pub fn without_compression(mut self) -> Self {
        self.config.compression = Some(None);
        self
    }

    /// PEM file with the CA certificate that signed the collector's certificate.
    pub fn with_certificate(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.certificate = Some(path.into());
        self
    }

    /// PEM file with the client certificate for mutual TLS.
    pub fn with_client_certificate(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.client_certificate = Some(path.into());
        self
    }

    /// PEM file with the client private key for mutual TLS.
    pub fn with_client_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.client_key = Some(path.into());
        self
    }

    /// Replace all programmatic settings at once.
    pub fn with_export_config(mut self, config: ExportConfig) -> Self {
        self.config = config;
        self
    }

    /// How failed sends are retried.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Send through `transport` instead of the HTTP or gRPC client the
    /// protocol would select. The protocol still chooses the encoding.
    pub fn with_transport(mut self, transport: impl TransportClient + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Resolve the configuration and create the transport.
    pub fn build(self) -> Result<OtlpExporter, ExporterBuildError> {
        let resolved = self.config.resolve()?;
        let protocol = resolved.protocol;
        let transport = match self.transport {
            Some(transport) => transport,
            None => build_transport(resolved)?,
        };
        let protocol_name = protocol.to_string();
        otel_debug!(name: "OtlpExporter.Built", protocol = protocol_name.as_str());
        Ok(OtlpExporter {
            encoder: Encoder::new(protocol),
            transport: RetryingClient::new(transport, self.retry_policy),
            is_shutdown: AtomicBool::new(false),
            reported_errors: Mutex::new(HashSet::new()),
        })
    }
}

fn build_transport(resolved: ResolvedConfig) -> Result<Box<dyn TransportClient>, ExporterBuildError> {
    match resolved.protocol {
        #[cfg(feature = "grpc-tonic")]
        Protocol::Grpc => Ok(Box::new(crate::exporter::tonic::TonicTransport::new(
            resolved.signals,
        )?)),
        #[cfg(not(feature = "grpc-tonic"))]
        Protocol::Grpc => Err(ExporterBuildError::FeatureRequiredForProtocol(
            "grpc-tonic",
            Protocol::Grpc,
        )),
        #[cfg(feature = "http-client")]
        Protocol::HttpBinary | Protocol::HttpJson => Ok(Box::new(
            crate::exporter::http::HttpTransport::new(resolved.signals)?,
        )),
        #[cfg(not(feature = "http-client"))]
        protocol @ (Protocol::HttpBinary | Protocol::HttpJson) => Err(
            ExporterBuildError::FeatureRequiredForProtocol("http-client", protocol),
        ),
    }
}

/// Exports records of every signal over OTLP.
///
/// A batch is split by signal; each group is encoded and sent separately,
/// and the export succeeds only when every group was delivered.
#[derive(Debug)]
pub struct OtlpExporter {
    encoder: Encoder,
    transport: RetryingClient<Box<dyn TransportClient>>,
    is_shutdown: AtomicBool,
    reported_errors: Mutex<HashSet<String>>,
}

impl OtlpExporter {
    /// Start configuring an exporter.
    pub fn builder() -> OtlpExporterBuilder {
        OtlpExporterBuilder::default()
    }

    /// The protocol payloads are encoded for.
    pub fn protocol(&self) -> Protocol {
        self.encoder.protocol()
    }

    fn export_signal(&self, signal: Signal, batch: &[Record]) -> Result<(), String> {
        let request = self.encoder.encode(signal, batch).map_err(|err| {
            let message = err.to_string();
            self.report_failure(signal, &message);
            message
        })?;

        match self.transport.send(&request) {
            Ok(response) => {
                if let Some(partial) = self.encoder.decode_partial_success(&response.body) {
                    otel_warn!(
                        name: "OtlpExporter.PartialSuccess",
                        signal = signal.as_str(),
                        rejected = partial.rejected,
                        message = partial.error_message.as_str()
                    );
                }
                Ok(())
            }
            Err(err) => {
                self.report_failure(signal, &err.message);
                Err(format!("{signal} export failed: {}", err.message))
            }
        }
    }

    /// Error level the first time a message is seen, debug afterwards.
    fn report_failure(&self, signal: Signal, message: &str) {
        let first_time = match self.reported_errors.lock() {
            Ok(mut seen) => {
                let first_time = !seen.contains(message);
                if first_time && seen.len() < MAX_REPORTED_ERRORS {
                    seen.insert(message.to_owned());
                }
                first_time
            }
            Err(_) => true,
        };
        if first_time {
            otel_error!(
                name: "OtlpExporter.ExportFailed",
                signal = signal.as_str(),
                error = message
            );
        } else {
            otel_debug!(
                name: "OtlpExporter.ExportFailed",
                signal = signal.as_str(),
                error = message
            );
        }
    }
}

impl Exporter for OtlpExporter {
    fn export(&self, batch: Vec<Record>) -> SdkResult {
        if self.is_shutdown.load(Ordering::Acquire) {
            return Err(SdkError::AlreadyShutdown);
        }

        let failures: Vec<String> = Signal::ALL
            .into_iter()
            .filter(|signal| batch.iter().any(|record| record.signal() == *signal))
            .filter_map(|signal| self.export_signal(signal, &batch).err())
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SdkError::InternalFailure(failures.join("; ")))
        }
    }

    fn shutdown_with_timeout(&self, _timeout: Duration) -> SdkResult {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            otel_warn!(name: "OtlpExporter.AlreadyShutdown");
            return Ok(());
        }
        self.transport.shutdown();
        otel_debug!(name: "OtlpExporter.Shutdown");
        Ok(())
    }
}
