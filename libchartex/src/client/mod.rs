//! HTTP transport shared by repository and registry access.
//!
//! This module provides a thin client built on reqwest. It owns connection
//! pooling, timeouts and TLS material, and translates transport failures and
//! HTTP error statuses into [`ChartexError`] values. Protocol logic (index
//! downloads, OCI distribution calls) lives in the modules using it.

use crate::auth::Credentials;
use crate::config::Config;
use crate::error::{ChartexError, Result};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Certificate, Client as ReqwestClient, Identity, RequestBuilder, Response, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;


/// Configuration for the HTTP client.
///
/// Use the builder methods to customize:
///
/// # Examples
///
/// ```
/// use libchartex::client::ClientConfig;
///
/// let config = ClientConfig::new()
///     .with_timeout(60)
///     .with_insecure_skip_verify(true);
/// assert_eq!(config.timeout_seconds, 60);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// Maximum idle connections per host (default: 10)
    pub max_idle_per_host: usize,
    /// Extra CA bundle (PEM) trusted for server verification
    pub ca_file: Option<PathBuf>,
    /// Client certificate and key (PEM) for mutual TLS
    pub client_identity: Option<(PathBuf, PathBuf)>,
    pub insecure_skip_verify: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_idle_per_host: 10,
            ca_file: None,
            client_identity: None,
            insecure_skip_verify: false,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives the transport settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        let client_identity = match (&config.tls.cert_file, &config.tls.key_file) {
            (Some(cert), Some(key)) => Some((PathBuf::from(cert), PathBuf::from(key))),
            _ => None,
        };

        Self {
            timeout_seconds: config.network.timeout,
            max_idle_per_host: config.network.max_idle_per_host,
            ca_file: config.tls.ca_file.as_ref().map(PathBuf::from),
            client_identity,
            insecure_skip_verify: config.tls.insecure_skip_verify,
        }
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_max_idle_per_host(mut self, max: usize) -> Self {
        self.max_idle_per_host = max;
        self
    }

    pub fn with_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(path.into());
        self
    }

    pub fn with_client_identity(
        mut self,
        cert_file: impl Into<PathBuf>,
        key_file: impl Into<PathBuf>,
    ) -> Self {
        self.client_identity = Some((cert_file.into(), key_file.into()));
        self
    }

    pub fn with_insecure_skip_verify(mut self, insecure: bool) -> Self {
        self.insecure_skip_verify = insecure;
        self
    }
}

/// HTTP client used for chart repositories and OCI registries.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    http_client: ReqwestClient,
    timeout_seconds: u64,
}

impl Client {
    /// Creates a client with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a client with custom configuration.
    ///
    /// # Errors
    ///
    /// Fails when a configured CA bundle or client certificate cannot be
    /// read or parsed.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut builder = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .pool_max_idle_per_host(config.max_idle_per_host)
            .danger_accept_invalid_certs(config.insecure_skip_verify);

        if let Some(ca_file) = &config.ca_file {
            let pem = read_pem(ca_file, "CA bundle")?;
            let certificate = Certificate::from_pem(&pem)
                .map_err(|e| ChartexError::validation_with_source("Invalid CA bundle", e))?;
            builder = builder.add_root_certificate(certificate);
        }

        if let Some((cert_file, key_file)) = &config.client_identity {
            // rustls expects certificate and key in one PEM buffer
            let mut pem = read_pem(cert_file, "client certificate")?;
            pem.push(b'\n');
            pem.extend(read_pem(key_file, "client key")?);
            let identity = Identity::from_pem(&pem).map_err(|e| {
                ChartexError::validation_with_source("Invalid client certificate or key", e)
            })?;
            builder = builder.identity(identity);
        }

        let http_client = builder
            .build()
            .map_err(|e| ChartexError::network_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            http_client,
            timeout_seconds: config.timeout_seconds,
        })
    }

    /// Starts a GET request, attaching an Authorization header when
    /// credentials are given.
    pub(crate) fn get(&self, url: &str, credentials: Option<&Credentials>) -> RequestBuilder {
        let mut request = self.http_client.get(url);
        if let Some(creds) = credentials
            && let Some(auth_header) = creds.to_header_value()
        {
            request = request.header(reqwest::header::AUTHORIZATION, auth_header);
        }
        request
    }

    /// Sends a request without interpreting the response status.
    pub(crate) async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response> {
        request
            .send()
            .await
            .map_err(|e| self.translate_reqwest_error(e, url))
    }

    /// Downloads `url` and returns the response body.
    ///
    /// # Errors
    ///
    /// Transport failures become [`ChartexError::Network`]; error statuses
    /// are translated by status class (401/403, 404, 429, 5xx).
    pub async fn get_bytes(&self, url: &str, credentials: Option<&Credentials>) -> Result<Vec<u8>> {
        let response = self.send(self.get(url, credentials), url).await?;
        let response = Self::check_response_status(response).await?;

        let bytes = response.bytes().await.map_err(|e| {
            ChartexError::network_with_source(format!("Failed to read response from {}", url), e)
        })?;

        Ok(bytes.to_vec())
    }

    /// Extracts the next page URL from the Link header.
    ///
    /// Registries paginate with `Link: </v2/name/tags/list?n=100&last=x>; rel="next"`.
    pub(crate) fn extract_next_link(headers: &HeaderMap) -> Option<String> {
        let link_header = headers.get(reqwest::header::LINK)?;
        let link_str = link_header.to_str().ok()?;

        for link_part in link_str.split(',') {
            let link_part = link_part.trim();

            if (link_part.contains("rel=\"next\"") || link_part.contains("rel='next'"))
                && let Some(start) = link_part.find('<')
                && let Some(end) = link_part.find('>')
            {
                return Some(link_part[start + 1..end].to_string());
            }
        }

        None
    }

    fn translate_reqwest_error(&self, error: reqwest::Error, url: &str) -> ChartexError {
        if error.is_timeout() {
            ChartexError::network_with_source(
                format!(
                    "Request to {} timed out after {} seconds",
                    url, self.timeout_seconds
                ),
                error,
            )
        } else if error.is_connect() {
            ChartexError::network_with_source(format!("Failed to connect to {}", url), error)
        } else if error.is_request() {
            ChartexError::network_with_source(format!("Failed to send request to {}", url), error)
        } else {
            ChartexError::network_with_source(
                format!("Network error communicating with {}", url),
                error,
            )
        }
    }

    /// Checks the HTTP response status and translates errors to `ChartexError`.
    pub(crate) async fn check_response_status(response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let retry_after = parse_retry_after(response.headers());
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("(unable to read response body)"));

        match status {
            StatusCode::UNAUTHORIZED => Err(ChartexError::authentication(
                format!("Authentication required for {}: {}", url, error_body),
                Some(401),
            )),
            StatusCode::FORBIDDEN => Err(ChartexError::authentication(
                format!("Access forbidden for {}: {}", url, error_body),
                Some(403),
            )),
            StatusCode::NOT_FOUND => Err(ChartexError::not_found("resource", url)),
            StatusCode::TOO_MANY_REQUESTS => Err(ChartexError::rate_limit(
                format!("Rate limit exceeded for {}", url),
                retry_after,
            )),
            StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT => Err(ChartexError::server(
                format!("Server error from {}: {}", url, error_body),
                status.as_u16(),
            )),
            _ => Err(ChartexError::network(format!(
                "HTTP {} from {}: {}",
                status.as_u16(),
                url,
                error_body
            ))),
        }
    }
}

/// Reads the Retry-After header as delta seconds or an HTTP date.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(seconds);
    }

    let date = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let seconds = (date.with_timezone(&chrono::Utc) - chrono::Utc::now()).num_seconds();
    u64::try_from(seconds).ok()
}

/// Returns true when both URLs point at the same scheme, host and port.
///
/// Repository credentials are only sent to other hosts when the caller
/// explicitly allows it.
pub fn same_origin(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a.origin() == b.origin(),
        _ => false,
    }
}

fn read_pem(path: &Path, what: &str) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        ChartexError::config_with_source(
            format!("Failed to read {}", what),
            Some(path.display().to_string()),
            e,
        )
    })
}
