//! Exporter configuration and the network transports built from it.
//!
//! Every option resolves in the same order: a value set on the builder, then
//! the signal-specific environment variable, then the generic one, then the
//! default. Malformed environment values are skipped with a warning; malformed
//! programmatic values fail [`build`](crate::OtlpExporterBuilder::build).
use crate::encoder::Protocol;
use ::http::{HeaderMap, HeaderName, HeaderValue, Uri};
#[cfg(any(feature = "http-client", feature = "grpc-tonic"))]
use crate::transport::TransportError;
#[cfg(any(feature = "http-client", feature = "grpc-tonic"))]
use otel_pipeline_sdk::Context;
use otel_pipeline_sdk::{otel_warn, Signal};
use std::collections::HashMap;
use std::env;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "http-client")]
pub(crate) mod http;
#[cfg(feature = "grpc-tonic")]
pub(crate) mod tonic;

/// Target for all signals. For HTTP, `/v1/{signal}` is appended.
pub const OTEL_EXPORTER_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
/// Target for spans, used as is.
pub const OTEL_EXPORTER_OTLP_TRACES_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_TRACES_ENDPOINT";
/// Target for metrics, used as is.
pub const OTEL_EXPORTER_OTLP_METRICS_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_METRICS_ENDPOINT";
/// Target for logs, used as is.
pub const OTEL_EXPORTER_OTLP_LOGS_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_LOGS_ENDPOINT";
/// Request headers for all signals, `k1=v1,k2=v2` with URL-encoded values.
pub const OTEL_EXPORTER_OTLP_HEADERS: &str = "OTEL_EXPORTER_OTLP_HEADERS";
/// Request headers for spans.
pub const OTEL_EXPORTER_OTLP_TRACES_HEADERS: &str = "OTEL_EXPORTER_OTLP_TRACES_HEADERS";
/// Request headers for metrics.
pub const OTEL_EXPORTER_OTLP_METRICS_HEADERS: &str = "OTEL_EXPORTER_OTLP_METRICS_HEADERS";
/// Request headers for logs.
pub const OTEL_EXPORTER_OTLP_LOGS_HEADERS: &str = "OTEL_EXPORTER_OTLP_LOGS_HEADERS";
/// Per-request timeout in milliseconds for all signals.
pub const OTEL_EXPORTER_OTLP_TIMEOUT: &str = "OTEL_EXPORTER_OTLP_TIMEOUT";
/// Per-request timeout for spans.
pub const OTEL_EXPORTER_OTLP_TRACES_TIMEOUT: &str = "OTEL_EXPORTER_OTLP_TRACES_TIMEOUT";
/// Per-request timeout for metrics.
pub const OTEL_EXPORTER_OTLP_METRICS_TIMEOUT: &str = "OTEL_EXPORTER_OTLP_METRICS_TIMEOUT";
/// Per-request timeout for logs.
pub const OTEL_EXPORTER_OTLP_LOGS_TIMEOUT: &str = "OTEL_EXPORTER_OTLP_LOGS_TIMEOUT";
/// Payload compression for all signals: `gzip` or `none`.
pub const OTEL_EXPORTER_OTLP_COMPRESSION: &str = "OTEL_EXPORTER_OTLP_COMPRESSION";
/// Payload compression for spans.
pub const OTEL_EXPORTER_OTLP_TRACES_COMPRESSION: &str = "OTEL_EXPORTER_OTLP_TRACES_COMPRESSION";
/// Payload compression for metrics.
pub const OTEL_EXPORTER_OTLP_METRICS_COMPRESSION: &str = "OTEL_EXPORTER_OTLP_METRICS_COMPRESSION";
/// Payload compression for logs.
pub const OTEL_EXPORTER_OTLP_LOGS_COMPRESSION: &str = "OTEL_EXPORTER_OTLP_LOGS_COMPRESSION";
/// Protocol: `grpc`, `http/protobuf` or `http/json`.
pub const OTEL_EXPORTER_OTLP_PROTOCOL: &str = "OTEL_EXPORTER_OTLP_PROTOCOL";
/// PEM file with the CA certificate used to verify the server.
pub const OTEL_EXPORTER_OTLP_CERTIFICATE: &str = "OTEL_EXPORTER_OTLP_CERTIFICATE";
/// PEM file with the client certificate for mutual TLS.
pub const OTEL_EXPORTER_OTLP_CLIENT_CERTIFICATE: &str = "OTEL_EXPORTER_OTLP_CLIENT_CERTIFICATE";
/// PEM file with the client private key for mutual TLS.
pub const OTEL_EXPORTER_OTLP_CLIENT_KEY: &str = "OTEL_EXPORTER_OTLP_CLIENT_KEY";
/// CA certificate for spans.
pub const OTEL_EXPORTER_OTLP_TRACES_CERTIFICATE: &str = "OTEL_EXPORTER_OTLP_TRACES_CERTIFICATE";
/// Client certificate for spans.
pub const OTEL_EXPORTER_OTLP_TRACES_CLIENT_CERTIFICATE: &str =
    "OTEL_EXPORTER_OTLP_TRACES_CLIENT_CERTIFICATE";
/// Client key for spans.
pub const OTEL_EXPORTER_OTLP_TRACES_CLIENT_KEY: &str = "OTEL_EXPORTER_OTLP_TRACES_CLIENT_KEY";
/// CA certificate for metrics.
pub const OTEL_EXPORTER_OTLP_METRICS_CERTIFICATE: &str = "OTEL_EXPORTER_OTLP_METRICS_CERTIFICATE";
/// Client certificate for metrics.
pub const OTEL_EXPORTER_OTLP_METRICS_CLIENT_CERTIFICATE: &str =
    "OTEL_EXPORTER_OTLP_METRICS_CLIENT_CERTIFICATE";
/// Client key for metrics.
pub const OTEL_EXPORTER_OTLP_METRICS_CLIENT_KEY: &str = "OTEL_EXPORTER_OTLP_METRICS_CLIENT_KEY";
/// CA certificate for logs.
pub const OTEL_EXPORTER_OTLP_LOGS_CERTIFICATE: &str = "OTEL_EXPORTER_OTLP_LOGS_CERTIFICATE";
/// Client certificate for logs.
pub const OTEL_EXPORTER_OTLP_LOGS_CLIENT_CERTIFICATE: &str =
    "OTEL_EXPORTER_OTLP_LOGS_CLIENT_CERTIFICATE";
/// Client key for logs.
pub const OTEL_EXPORTER_OTLP_LOGS_CLIENT_KEY: &str = "OTEL_EXPORTER_OTLP_LOGS_CLIENT_KEY";

/// Default per-request timeout.
pub const OTEL_EXPORTER_OTLP_TIMEOUT_DEFAULT: Duration = Duration::from_millis(10_000);
/// Default HTTP collector address.
pub const OTEL_EXPORTER_OTLP_HTTP_ENDPOINT_DEFAULT: &str = "http://localhost:4318";
/// Default gRPC collector address.
pub const OTEL_EXPORTER_OTLP_GRPC_ENDPOINT_DEFAULT: &str = "http://localhost:4317";

struct SignalEnvVars {
    endpoint: &'static str,
    headers: &'static str,
    timeout: &'static str,
    compression: &'static str,
    certificate: &'static str,
    client_certificate: &'static str,
    client_key: &'static str,
}

fn signal_env_vars(signal: Signal) -> SignalEnvVars {
    match signal {
        Signal::Traces => SignalEnvVars {
            endpoint: OTEL_EXPORTER_OTLP_TRACES_ENDPOINT,
            headers: OTEL_EXPORTER_OTLP_TRACES_HEADERS,
            timeout: OTEL_EXPORTER_OTLP_TRACES_TIMEOUT,
            compression: OTEL_EXPORTER_OTLP_TRACES_COMPRESSION,
            certificate: OTEL_EXPORTER_OTLP_TRACES_CERTIFICATE,
            client_certificate: OTEL_EXPORTER_OTLP_TRACES_CLIENT_CERTIFICATE,
            client_key: OTEL_EXPORTER_OTLP_TRACES_CLIENT_KEY,
        },
        Signal::Metrics => SignalEnvVars {
            endpoint: OTEL_EXPORTER_OTLP_METRICS_ENDPOINT,
            headers: OTEL_EXPORTER_OTLP_METRICS_HEADERS,
            timeout: OTEL_EXPORTER_OTLP_METRICS_TIMEOUT,
            compression: OTEL_EXPORTER_OTLP_METRICS_COMPRESSION,
            certificate: OTEL_EXPORTER_OTLP_METRICS_CERTIFICATE,
            client_certificate: OTEL_EXPORTER_OTLP_METRICS_CLIENT_CERTIFICATE,
            client_key: OTEL_EXPORTER_OTLP_METRICS_CLIENT_KEY,
        },
        Signal::Logs => SignalEnvVars {
            endpoint: OTEL_EXPORTER_OTLP_LOGS_ENDPOINT,
            headers: OTEL_EXPORTER_OTLP_LOGS_HEADERS,
            timeout: OTEL_EXPORTER_OTLP_LOGS_TIMEOUT,
            compression: OTEL_EXPORTER_OTLP_LOGS_COMPRESSION,
            certificate: OTEL_EXPORTER_OTLP_LOGS_CERTIFICATE,
            client_certificate: OTEL_EXPORTER_OTLP_LOGS_CLIENT_CERTIFICATE,
            client_key: OTEL_EXPORTER_OTLP_LOGS_CLIENT_KEY,
        },
    }
}

/// Errors that can occur while building an exporter.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ExporterBuildError {
    /// Spawning a new thread failed.
    #[error("Spawning a new thread failed. Unable to create the blocking HTTP client.")]
    ThreadSpawnFailed,

    /// Unsupported compression algorithm.
    #[error("unsupported compression algorithm '{0}'")]
    UnsupportedCompressionAlgorithm(String),

    /// The selected protocol was compiled out.
    #[error("feature '{0}' is required to use protocol '{1}'")]
    FeatureRequiredForProtocol(&'static str, Protocol),

    /// Invalid URI.
    #[error("invalid URI {0}. Reason {1}")]
    InvalidUri(String, String),

    /// Invalid configuration.
    #[error("{name}: {reason}")]
    InvalidConfig {
        /// The configuration name.
        name: String,
        /// The reason the configuration is invalid.
        reason: String,
    },

    /// Failed due to an internal error, such as a client or runtime that
    /// could not be constructed. The message is meant for logging only.
    #[error("Reason: {0}")]
    InternalFailure(String),
}

/// Payload compression.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Compression {
    /// Compresses data using gzip.
    Gzip,
}

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::Gzip => write!(f, "gzip"),
        }
    }
}

impl FromStr for Compression {
    type Err = ExporterBuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "gzip" => Ok(Compression::Gzip),
            other => Err(ExporterBuildError::UnsupportedCompressionAlgorithm(
                other.to_string(),
            )),
        }
    }
}

/// `none` turns compression off.
fn parse_compression(value: &str) -> Result<Option<Compression>, ExporterBuildError> {
    if value.trim().eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        value.parse().map(Some)
    }
}

/// Options set programmatically on the exporter builder. Anything left unset
/// falls back to the environment.
#[derive(Clone, Debug, Default)]
pub struct ExportConfig {
    /// Base address for all signals.
    pub endpoint: Option<String>,
    /// Complete addresses for individual signals, used as is.
    pub signal_endpoints: HashMap<Signal, String>,
    /// Wire protocol.
    pub protocol: Option<Protocol>,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
    /// Extra request headers, applied over those from the environment.
    pub headers: HashMap<String, String>,
    /// Payload compression. `Some(None)` turns it off whatever the environment says.
    pub compression: Option<Option<Compression>>,
    /// CA certificate PEM file, for every signal.
    pub certificate: Option<PathBuf>,
    /// Client certificate PEM file.
    pub client_certificate: Option<PathBuf>,
    /// Client key PEM file.
    pub client_key: Option<PathBuf>,
}

/// Settings for one signal after resolution.
#[derive(Clone, Debug)]
pub(crate) struct SignalConfig {
    pub(crate) endpoint: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) timeout: Duration,
    pub(crate) compression: Option<Compression>,
    pub(crate) tls: TlsMaterial,
}

#[derive(Clone, Debug)]
pub(crate) struct SignalConfigs {
    pub(crate) traces: SignalConfig,
    pub(crate) metrics: SignalConfig,
    pub(crate) logs: SignalConfig,
}

impl SignalConfigs {
    pub(crate) fn get(&self, signal: Signal) -> &SignalConfig {
        match signal {
            Signal::Traces => &self.traces,
            Signal::Metrics => &self.metrics,
            Signal::Logs => &self.logs,
        }
    }
}

/// PEM material read from the configured files.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct TlsMaterial {
    pub(crate) ca_certificate: Option<Vec<u8>>,
    /// Client certificate and key.
    pub(crate) identity: Option<(Vec<u8>, Vec<u8>)>,
}

#[derive(Clone, Debug)]
pub(crate) struct ResolvedConfig {
    pub(crate) protocol: Protocol,
    pub(crate) signals: SignalConfigs,
}

impl ExportConfig {
    pub(crate) fn resolve(&self) -> Result<ResolvedConfig, ExporterBuildError> {
        let protocol = self.protocol.unwrap_or_else(default_protocol);
        let signal = |signal| self.resolve_signal(protocol, signal);
        Ok(ResolvedConfig {
            protocol,
            signals: SignalConfigs {
                traces: signal(Signal::Traces)?,
                metrics: signal(Signal::Metrics)?,
                logs: signal(Signal::Logs)?,
            },
        })
    }

    fn resolve_signal(
        &self,
        protocol: Protocol,
        signal: Signal,
    ) -> Result<SignalConfig, ExporterBuildError> {
        let vars = signal_env_vars(signal);
        Ok(SignalConfig {
            endpoint: resolve_endpoint(
                self.signal_endpoints.get(&signal).map(String::as_str),
                self.endpoint.as_deref(),
                vars.endpoint,
                protocol,
                signal,
            )?,
            headers: resolve_headers(&self.headers, vars.headers)?,
            timeout: resolve_timeout(vars.timeout, self.timeout.as_ref()),
            compression: resolve_compression(self.compression, vars.compression)?,
            tls: self.resolve_tls(&vars)?,
        })
    }

    /// Each file resolves on its own: builder, signal variable, generic
    /// variable. The client certificate and key must then come as a pair.
    fn resolve_tls(&self, vars: &SignalEnvVars) -> Result<TlsMaterial, ExporterBuildError> {
        let path = |explicit: &Option<PathBuf>, signal_var: &str, generic_var: &str| {
            explicit.clone().or_else(|| {
                [signal_var, generic_var]
                    .into_iter()
                    .find_map(|var| env::var_os(var).filter(|v| !v.is_empty()))
                    .map(PathBuf::from)
            })
        };
        let certificate = path(
            &self.certificate,
            vars.certificate,
            OTEL_EXPORTER_OTLP_CERTIFICATE,
        );
        let client_certificate = path(
            &self.client_certificate,
            vars.client_certificate,
            OTEL_EXPORTER_OTLP_CLIENT_CERTIFICATE,
        );
        let client_key = path(
            &self.client_key,
            vars.client_key,
            OTEL_EXPORTER_OTLP_CLIENT_KEY,
        );

        let identity = match (client_certificate, client_key) {
            (Some(cert), Some(key)) => Some((read_pem("client certificate", &cert)?, read_pem("client key", &key)?)),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ExporterBuildError::InvalidConfig {
                    name: "client key".into(),
                    reason: "a client certificate was configured without a key".into(),
                })
            }
            (None, Some(_)) => {
                return Err(ExporterBuildError::InvalidConfig {
                    name: "client certificate".into(),
                    reason: "a client key was configured without a certificate".into(),
                })
            }
        };
        Ok(TlsMaterial {
            ca_certificate: certificate
                .map(|path| read_pem("certificate", &path))
                .transpose()?,
            identity,
        })
    }
}

/// Blocking on a thread that drives a tokio runtime panics, so from such a
/// thread `send` runs on a scoped helper thread instead.
#[cfg(any(feature = "http-client", feature = "grpc-tonic"))]
pub(crate) fn block_outside_runtime<R, F>(send: F) -> Result<R, TransportError>
where
    F: FnOnce() -> Result<R, TransportError> + Send,
    R: Send,
{
    if tokio::runtime::Handle::try_current().is_err() {
        return send();
    }
    std::thread::scope(|scope| {
        let handle = std::thread::Builder::new()
            .name("otlp-export".into())
            .spawn_scoped(scope, || {
                let _suppress_guard = Context::enter_telemetry_suppressed_scope();
                send()
            })
            .map_err(|err| {
                TransportError::retryable(format!("cannot spawn export thread: {err}"))
            })?;
        handle
            .join()
            .map_err(|_| TransportError::non_retryable("export thread panicked"))
            .and_then(|result| result)
    })
}

fn read_pem(name: &str, path: &PathBuf) -> Result<Vec<u8>, ExporterBuildError> {
    std::fs::read(path).map_err(|err| ExporterBuildError::InvalidConfig {
        name: name.to_string(),
        reason: format!("cannot read {}: {err}", path.display()),
    })
}

/// `OTEL_EXPORTER_OTLP_PROTOCOL` when set and valid, else the first protocol
/// compiled in, HTTP preferred.
pub(crate) fn default_protocol() -> Protocol {
    if let Ok(value) = env::var(OTEL_EXPORTER_OTLP_PROTOCOL) {
        match value.parse() {
            Ok(protocol) => return protocol,
            Err(err) => {
                let error = err.to_string();
                otel_warn!(name: "Exporter.InvalidProtocolEnv", error = error.as_str());
            }
        }
    }
    if cfg!(feature = "http-client") || !cfg!(feature = "grpc-tonic") {
        Protocol::HttpBinary
    } else {
        Protocol::Grpc
    }
}

fn default_endpoint(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::Grpc => OTEL_EXPORTER_OTLP_GRPC_ENDPOINT_DEFAULT,
        Protocol::HttpBinary | Protocol::HttpJson => OTEL_EXPORTER_OTLP_HTTP_ENDPOINT_DEFAULT,
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Uri, ExporterBuildError> {
    let uri: Uri = endpoint
        .parse()
        .map_err(|err: ::http::uri::InvalidUri| {
            ExporterBuildError::InvalidUri(endpoint.to_string(), err.to_string())
        })?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(ExporterBuildError::InvalidUri(
            endpoint.to_string(),
            "scheme and host are required".to_string(),
        ));
    }
    Ok(uri)
}

/// Appends `/v1/{signal}` to a base address without doubling the slash.
fn append_signal_path(base: &str, signal: Signal) -> String {
    format!("{}/v1/{}", base.trim_end_matches('/'), signal.as_str())
}

fn resolve_endpoint(
    signal_endpoint: Option<&str>,
    base_endpoint: Option<&str>,
    signal_env_var: &str,
    protocol: Protocol,
    signal: Signal,
) -> Result<Uri, ExporterBuildError> {
    let with_path = |base: &str| {
        if protocol.is_http() {
            append_signal_path(base, signal)
        } else {
            base.to_string()
        }
    };

    if let Some(endpoint) = signal_endpoint.filter(|e| !e.is_empty()) {
        return parse_endpoint(endpoint);
    }
    if let Some(base) = base_endpoint.filter(|e| !e.is_empty()) {
        return parse_endpoint(&with_path(base));
    }
    // Per-signal env is used as is; invalid values fall through.
    if let Some(endpoint) = env_endpoint(signal_env_var, |value| value.to_string()) {
        return Ok(endpoint);
    }
    if let Some(endpoint) = env_endpoint(OTEL_EXPORTER_OTLP_ENDPOINT, with_path) {
        return Ok(endpoint);
    }
    parse_endpoint(&with_path(default_endpoint(protocol)))
}

fn env_endpoint(var: &str, to_endpoint: impl Fn(&str) -> String) -> Option<Uri> {
    let value = env::var(var).ok().filter(|v| !v.is_empty())?;
    match parse_endpoint(&to_endpoint(&value)) {
        Ok(uri) => Some(uri),
        Err(err) => {
            let error = err.to_string();
            otel_warn!(
                name: "Exporter.InvalidEndpointEnv",
                variable = var,
                error = error.as_str()
            );
            None
        }
    }
}

/// Later sources override earlier ones: the default `User-Agent`, then the
/// generic variable, then the signal variable, then programmatic headers.
fn resolve_headers(
    provided: &HashMap<String, String>,
    signal_env_var: &str,
) -> Result<HeaderMap, ExporterBuildError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ::http::header::USER_AGENT,
        HeaderValue::from_static(concat!("otel-pipeline-otlp/", env!("CARGO_PKG_VERSION"))),
    );
    for var in [OTEL_EXPORTER_OTLP_HEADERS, signal_env_var] {
        if let Ok(value) = env::var(var) {
            add_headers_from_string(&value, &mut headers);
        }
    }
    for (key, value) in provided {
        let name = HeaderName::from_str(key).map_err(|err| ExporterBuildError::InvalidConfig {
            name: format!("header {key}"),
            reason: err.to_string(),
        })?;
        let value = HeaderValue::from_str(value).map_err(|err| {
            ExporterBuildError::InvalidConfig {
                name: format!("header {key}"),
                reason: err.to_string(),
            }
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn add_headers_from_string(input: &str, headers: &mut HeaderMap) {
    for (key, value) in parse_header_string(input) {
        match (HeaderName::from_str(key), HeaderValue::from_str(&value)) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => {
                otel_warn!(name: "Exporter.InvalidHeaderEnv", key = key);
            }
        }
    }
}

fn resolve_timeout(signal_timeout_var: &str, provided: Option<&Duration>) -> Duration {
    if let Some(timeout) = provided {
        return *timeout;
    }
    [signal_timeout_var, OTEL_EXPORTER_OTLP_TIMEOUT]
        .into_iter()
        .find_map(|var| env::var(var).ok()?.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(OTEL_EXPORTER_OTLP_TIMEOUT_DEFAULT)
}

fn resolve_compression(
    provided: Option<Option<Compression>>,
    signal_env_var: &str,
) -> Result<Option<Compression>, ExporterBuildError> {
    if let Some(compression) = provided {
        Ok(compression)
    } else if let Ok(value) = env::var(signal_env_var) {
        parse_compression(&value)
    } else if let Ok(value) = env::var(OTEL_EXPORTER_OTLP_COMPRESSION) {
        parse_compression(&value)
    } else {
        Ok(None)
    }
}

/// Splits `k1=v1,k2=v2`, dropping entries without a key or a value.
fn parse_header_string(value: &str) -> impl Iterator<Item = (&str, String)> {
    value
        .split_terminator(',')
        .map(str::trim)
        .filter_map(parse_header_key_value_string)
}

fn parse_header_key_value_string(key_value: &str) -> Option<(&str, String)> {
    let (key, value) = key_value.split_once('=')?;
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, url_decode(value).unwrap_or_else(|| value.to_string())))
}

/// Percent-decodes `value`. `None` if an escape is malformed or the result
/// is not UTF-8.
fn url_decode(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = std::str::from_utf8(bytes.get(i + 1..i + 3)?).ok()?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) fn run_env_test<'a, T, F>(env_vars: T, f: F)
    where
        F: FnOnce(),
        T: Into<Vec<(&'static str, &'a str)>>,
    {
        let mut vars: Vec<(&'static str, Option<&'a str>)> = ALL_VARS
            .iter()
            .map(|var| (*var, None))
            .collect();
        for (key, value) in env_vars.into() {
            vars.retain(|(k, _)| *k != key);
            vars.push((key, Some(value)));
        }
        temp_env::with_vars(vars, f)
    }

    const ALL_VARS: [&str; 29] = [
        OTEL_EXPORTER_OTLP_ENDPOINT,
        OTEL_EXPORTER_OTLP_TRACES_ENDPOINT,
        OTEL_EXPORTER_OTLP_METRICS_ENDPOINT,
        OTEL_EXPORTER_OTLP_LOGS_ENDPOINT,
        OTEL_EXPORTER_OTLP_HEADERS,
        OTEL_EXPORTER_OTLP_TRACES_HEADERS,
        OTEL_EXPORTER_OTLP_METRICS_HEADERS,
        OTEL_EXPORTER_OTLP_LOGS_HEADERS,
        OTEL_EXPORTER_OTLP_TIMEOUT,
        OTEL_EXPORTER_OTLP_TRACES_TIMEOUT,
        OTEL_EXPORTER_OTLP_METRICS_TIMEOUT,
        OTEL_EXPORTER_OTLP_LOGS_TIMEOUT,
        OTEL_EXPORTER_OTLP_COMPRESSION,
        OTEL_EXPORTER_OTLP_TRACES_COMPRESSION,
        OTEL_EXPORTER_OTLP_METRICS_COMPRESSION,
        OTEL_EXPORTER_OTLP_LOGS_COMPRESSION,
        OTEL_EXPORTER_OTLP_PROTOCOL,
        OTEL_EXPORTER_OTLP_CERTIFICATE,
        OTEL_EXPORTER_OTLP_CLIENT_CERTIFICATE,
        OTEL_EXPORTER_OTLP_CLIENT_KEY,
        OTEL_EXPORTER_OTLP_TRACES_CERTIFICATE,
        OTEL_EXPORTER_OTLP_TRACES_CLIENT_CERTIFICATE,
        OTEL_EXPORTER_OTLP_TRACES_CLIENT_KEY,
        OTEL_EXPORTER_OTLP_METRICS_CERTIFICATE,
        OTEL_EXPORTER_OTLP_METRICS_CLIENT_CERTIFICATE,
        OTEL_EXPORTER_OTLP_METRICS_CLIENT_KEY,
        OTEL_EXPORTER_OTLP_LOGS_CERTIFICATE,
        OTEL_EXPORTER_OTLP_LOGS_CLIENT_CERTIFICATE,
        OTEL_EXPORTER_OTLP_LOGS_CLIENT_KEY,
    ];

    fn http_config() -> ExportConfig {
        ExportConfig {
            protocol: Some(Protocol::HttpBinary),
            ..Default::default()
        }
    }

    #[test]
    fn generic_env_endpoint_gets_signal_path() {
        run_env_test(vec![(OTEL_EXPORTER_OTLP_ENDPOINT, "http://example.com/")], || {
            let resolved = http_config().resolve().unwrap();
            assert_eq!(resolved.signals.traces.endpoint.to_string(), "http://example.com/v1/traces");
            assert_eq!(resolved.signals.logs.endpoint.to_string(), "http://example.com/v1/logs");
        });
    }

    #[test]
    fn signal_env_endpoint_is_used_as_is_and_wins() {
        run_env_test(
            vec![
                (OTEL_EXPORTER_OTLP_TRACES_ENDPOINT, "http://traces.example.com"),
                (OTEL_EXPORTER_OTLP_ENDPOINT, "http://wrong.example.com"),
            ],
            || {
                let resolved = http_config().resolve().unwrap();
                assert_eq!(resolved.signals.traces.endpoint.to_string(), "http://traces.example.com/");
                assert_eq!(
                    resolved.signals.metrics.endpoint.to_string(),
                    "http://wrong.example.com/v1/metrics"
                );
            },
        );
    }

    #[test]
    fn explicit_endpoint_beats_env() {
        run_env_test(
            vec![(OTEL_EXPORTER_OTLP_TRACES_ENDPOINT, "http://env.example.com")],
            || {
                let mut config = http_config();
                config.endpoint = Some("http://code.example.com/base".into());
                config
                    .signal_endpoints
                    .insert(Signal::Logs, "http://logs.example.com/ingest".into());
                let resolved = config.resolve().unwrap();
                assert_eq!(
                    resolved.signals.traces.endpoint.to_string(),
                    "http://code.example.com/base/v1/traces"
                );
                assert_eq!(resolved.signals.logs.endpoint.to_string(), "http://logs.example.com/ingest");
            },
        );
    }

    #[test]
    fn defaults_depend_on_protocol() {
        run_env_test(vec![], || {
            let resolved = http_config().resolve().unwrap();
            assert_eq!(resolved.signals.metrics.endpoint.to_string(), "http://localhost:4318/v1/metrics");
            assert_eq!(resolved.signals.metrics.timeout, OTEL_EXPORTER_OTLP_TIMEOUT_DEFAULT);
            assert_eq!(resolved.signals.metrics.compression, None);

            let grpc = ExportConfig {
                protocol: Some(Protocol::Grpc),
                ..Default::default()
            }
            .resolve()
            .unwrap();
            assert_eq!(grpc.signals.traces.endpoint.to_string(), "http://localhost:4317/");
        });
    }

    #[test]
    fn invalid_env_endpoint_falls_back() {
        run_env_test(
            vec![
                (OTEL_EXPORTER_OTLP_TRACES_ENDPOINT, "-*/*-/*-//-/-/invalid-uri"),
                (OTEL_EXPORTER_OTLP_ENDPOINT, "http://example.com"),
            ],
            || {
                let resolved = http_config().resolve().unwrap();
                assert_eq!(resolved.signals.traces.endpoint.to_string(), "http://example.com/v1/traces");
            },
        );
    }

    #[test]
    fn invalid_explicit_endpoint_is_an_error() {
        run_env_test(vec![], || {
            let mut config = http_config();
            config.endpoint = Some("invalid_uri/something".into());
            assert!(matches!(
                config.resolve(),
                Err(ExporterBuildError::InvalidUri(_, _))
            ));
        });
    }

    #[test]
    fn timeout_precedence() {
        run_env_test(
            vec![
                (OTEL_EXPORTER_OTLP_TRACES_TIMEOUT, "3000"),
                (OTEL_EXPORTER_OTLP_TIMEOUT, "2000"),
            ],
            || {
                assert_eq!(
                    resolve_timeout(OTEL_EXPORTER_OTLP_TRACES_TIMEOUT, None),
                    Duration::from_millis(3000)
                );
                assert_eq!(
                    resolve_timeout(OTEL_EXPORTER_OTLP_LOGS_TIMEOUT, None),
                    Duration::from_millis(2000)
                );
                assert_eq!(
                    resolve_timeout(
                        OTEL_EXPORTER_OTLP_TRACES_TIMEOUT,
                        Some(&Duration::from_millis(1000))
                    ),
                    Duration::from_millis(1000)
                );
            },
        );
    }

    #[test]
    fn compression_from_env() {
        run_env_test(vec![(OTEL_EXPORTER_OTLP_COMPRESSION, "gzip")], || {
            assert_eq!(
                resolve_compression(None, OTEL_EXPORTER_OTLP_TRACES_COMPRESSION).unwrap(),
                Some(Compression::Gzip)
            );
            assert_eq!(
                resolve_compression(Some(None), OTEL_EXPORTER_OTLP_TRACES_COMPRESSION).unwrap(),
                None
            );
        });
        run_env_test(vec![(OTEL_EXPORTER_OTLP_LOGS_COMPRESSION, "none")], || {
            assert_eq!(
                resolve_compression(None, OTEL_EXPORTER_OTLP_LOGS_COMPRESSION).unwrap(),
                None
            );
        });
        run_env_test(vec![(OTEL_EXPORTER_OTLP_COMPRESSION, "brotli")], || {
            assert!(matches!(
                http_config().resolve(),
                Err(ExporterBuildError::UnsupportedCompressionAlgorithm(alg)) if alg == "brotli"
            ));
        });
    }

    #[test]
    fn headers_merge_in_precedence_order() {
        run_env_test(
            vec![
                (OTEL_EXPORTER_OTLP_HEADERS, "api-key=generic,tenant=a%20b"),
                (OTEL_EXPORTER_OTLP_TRACES_HEADERS, "api-key=traces"),
            ],
            || {
                let mut config = http_config();
                config.headers.insert("x-extra".into(), "1".into());
                let resolved = config.resolve().unwrap();
                let traces = &resolved.signals.traces.headers;
                assert_eq!(traces["api-key"], "traces");
                assert_eq!(traces["tenant"], "a b");
                assert_eq!(traces["x-extra"], "1");
                assert!(traces.contains_key(::http::header::USER_AGENT));
                assert_eq!(resolved.signals.logs.headers["api-key"], "generic");
            },
        );
    }

    #[test]
    fn test_parse_header_string() {
        let test_cases = vec![
            ("k1=v1", vec![("k1", "v1")]),
            ("k1=v1,k2=v2", vec![("k1", "v1"), ("k2", "v2")]),
            ("k1=v1=10,k2,k3", vec![("k1", "v1=10")]),
            ("k1=v1,,,k2,k3=10", vec![("k1", "v1"), ("k3", "10")]),
            ("k1=%XX,=v2,k3=", vec![("k1", "%XX")]),
        ];

        for (input, expected) in test_cases {
            assert_eq!(
                parse_header_string(input).collect::<Vec<_>>(),
                expected
                    .into_iter()
                    .map(|(k, v)| (k, v.to_string()))
                    .collect::<Vec<_>>(),
                "input: {input}"
            )
        }
    }

    #[test]
    fn test_url_decode() {
        assert_eq!(url_decode("v%201").as_deref(), Some("v 1"));
        assert_eq!(url_decode("v 1").as_deref(), Some("v 1"));
        assert_eq!(
            url_decode("%C3%B6%C3%A0%C2%A7%C3%96abcd%C3%84").as_deref(),
            Some("öà§ÖabcdÄ")
        );
        assert_eq!(url_decode("v%XX1"), None);
        assert_eq!(url_decode("trailing%2"), None);
    }

    #[test]
    fn client_certificate_requires_a_key() {
        run_env_test(vec![], || {
            let mut pem = tempfile::NamedTempFile::new().unwrap();
            pem.write_all(b"-----BEGIN CERTIFICATE-----").unwrap();
            let path = pem.path().to_path_buf();

            let mut config = http_config();
            config.client_certificate = Some(path.clone());
            assert!(matches!(
                config.resolve(),
                Err(ExporterBuildError::InvalidConfig { .. })
            ));

            config.client_certificate = None;
            config.client_key = Some(path.clone());
            assert!(matches!(
                config.resolve(),
                Err(ExporterBuildError::InvalidConfig { .. })
            ));

            config.client_certificate = Some(path);
            let resolved = config.resolve().unwrap();
            assert!(resolved.signals.traces.tls.identity.is_some());
            assert!(resolved.signals.logs.tls.identity.is_some());
        });
    }

    #[test]
    fn unreadable_certificate_is_an_error() {
        run_env_test(vec![], || {
            let mut config = http_config();
            config.certificate = Some(PathBuf::from("/nonexistent/ca.pem"));
            assert!(matches!(
                config.resolve(),
                Err(ExporterBuildError::InvalidConfig { .. })
            ));
        });
    }

    fn pem_file(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut pem = tempfile::NamedTempFile::new().unwrap();
        pem.write_all(contents).unwrap();
        pem
    }

    #[test]
    fn signal_tls_env_overrides_generic() {
        let generic = pem_file(b"generic-ca");
        let traces = pem_file(b"traces-ca");
        let generic_path = generic.path().display().to_string();
        let traces_path = traces.path().display().to_string();
        run_env_test(
            vec![
                (OTEL_EXPORTER_OTLP_CERTIFICATE, generic_path.as_str()),
                (OTEL_EXPORTER_OTLP_TRACES_CERTIFICATE, traces_path.as_str()),
            ],
            || {
                let resolved = http_config().resolve().unwrap();
                assert_eq!(
                    resolved.signals.traces.tls.ca_certificate.as_deref(),
                    Some(&b"traces-ca"[..])
                );
                assert_eq!(
                    resolved.signals.metrics.tls.ca_certificate.as_deref(),
                    Some(&b"generic-ca"[..])
                );

                let mut config = http_config();
                config.certificate = Some(generic.path().to_path_buf());
                let resolved = config.resolve().unwrap();
                assert_eq!(
                    resolved.signals.traces.tls.ca_certificate.as_deref(),
                    Some(&b"generic-ca"[..])
                );
            },
        );
    }

    #[test]
    fn signal_tls_env_is_validated() {
        run_env_test(
            vec![(OTEL_EXPORTER_OTLP_TRACES_CERTIFICATE, "/nonexistent/ca.pem")],
            || {
                assert!(matches!(
                    http_config().resolve(),
                    Err(ExporterBuildError::InvalidConfig { .. })
                ));
            },
        );
        let cert = pem_file(b"client-cert");
        let cert_path = cert.path().display().to_string();
        run_env_test(
            vec![(OTEL_EXPORTER_OTLP_LOGS_CLIENT_CERTIFICATE, cert_path.as_str())],
            || {
                assert!(matches!(
                    http_config().resolve(),
                    Err(ExporterBuildError::InvalidConfig { .. })
                ));
            },
        );
        run_env_test(
            vec![
                (OTEL_EXPORTER_OTLP_LOGS_CLIENT_CERTIFICATE, cert_path.as_str()),
                (OTEL_EXPORTER_OTLP_CLIENT_KEY, cert_path.as_str()),
            ],
            || {
                let resolved = http_config().resolve().unwrap();
                assert!(resolved.signals.logs.tls.identity.is_some());
                assert!(resolved.signals.traces.tls.identity.is_none());
            },
        );
    }
}
