// Transport: the byte pipe underneath the session.
//
// `Transport` is the only seam the session needs: post bytes to a URL, get
// back a status and bytes. `HttpTransport` is the reqwest-backed default;
// tests plug in scripted transports.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;
use url::Url;

use crate::error::Error;

/// Default dial/request timeout, matching LuCI's own client default.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// A completed HTTP exchange, before status classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Sends an encoded request body to an endpoint.
///
/// Connection, DNS, and timeout failures are returned as errors; any HTTP
/// status (including 4xx/5xx) is a successful exchange at this level.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        url: Url,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<RawResponse, Error>> + Send;
}

/// TLS verification mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (routers usually ship self-signed ones).
    DangerAcceptInvalid,
}

/// Settings for building the HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .tcp_keepalive(self.timeout)
            .user_agent(concat!("openwrt-api/", env!("CARGO_PKG_VERSION")));

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

/// reqwest-backed transport: `POST` with a JSON content type.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: config.build_client()?,
        })
    }

    /// Wrap a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, url: Url, body: Vec<u8>) -> Result<RawResponse, Error> {
        let resp = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(Error::Transport)?;
        trace!(status, len = body.len(), "response received");

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_system_roots() {
        let config = TransportConfig::default();
        assert_eq!(config.tls, TlsMode::System);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.build_client().is_ok());
    }

    #[test]
    fn missing_ca_file_is_a_tls_error() {
        let config = TransportConfig {
            tls: TlsMode::CustomCa(PathBuf::from("/nonexistent/ca.pem")),
            ..TransportConfig::default()
        };
        match config.build_client() {
            Err(Error::Tls(msg)) => assert!(msg.contains("failed to read CA cert"), "{msg}"),
            other => panic!("expected Tls error, got: {other:?}"),
        }
    }
}
