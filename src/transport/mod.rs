pub mod client;
pub mod stream;

use crate::errors::*;
use crate::format::Format;
use crate::manifest::{ManifestSource, LOCK_FILE};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

pub const DEFAULT_ENDPOINT: &str = "https://security.symfony.com/check_lock";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
pub const MAX_REDIRECTS: usize = 3;
/// Set to `stream` to force the low-level backend
pub const TRANSPORT_ENV: &str = "SECURITY_CHECKER_TRANSPORT";
/// Name of the multipart field carrying the manifest
pub const FORM_FIELD: &str = "lock";

/// Ordered header list, duplicates are kept
pub type Headers = Vec<(String, String)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub endpoint: String,
    pub manifest: Vec<u8>,
    pub headers: Headers,
}

impl Request {
    pub fn new(
        endpoint: &str,
        manifest: Vec<u8>,
        format: Format,
        global: &[(String, String)],
        extra: &[(String, String)],
    ) -> Request {
        let mut headers = vec![("Accept".to_string(), format.content_type().to_string())];
        headers.extend(global.iter().cloned());
        headers.extend(extra.iter().cloned());
        Request {
            endpoint: endpoint.to_string(),
            manifest,
            headers,
        }
    }

    pub fn filename(&self) -> &'static str {
        LOCK_FILE
    }
}

/// Form body with the manifest as its only file field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multipart {
    pub boundary: String,
    pub body: Vec<u8>,
}

impl Multipart {
    pub fn new(filename: &str, manifest: &[u8]) -> Multipart {
        let boundary = format!("------------------------{}", Uuid::new_v4().simple());
        let body = multipart_body(&boundary, filename, manifest);
        Multipart { boundary, body }
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

pub fn multipart_body(boundary: &str, filename: &str, manifest: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
        boundary, FORM_FIELD, filename
    )
    .into_bytes();
    body.extend_from_slice(manifest);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: String,
}

impl RawResponse {
    /// First header with this name, ignoring case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Backend name used in logs and the user agent
    fn name(&self) -> &'static str;

    /// Perform the request and return whatever the server answered
    async fn execute(&self, request: &Request) -> Result<RawResponse>;

    async fn send(&self, request: &Request, format: Format) -> Result<RawResponse> {
        info!("Sending lock file to {:?} ({})", request.endpoint, self.name());
        let response = self.execute(request).await?;
        debug!("Received HTTP {} from {:?}", response.status, request.endpoint);
        check_status(&response, format)?;
        Ok(response)
    }
}

pub fn check_status(response: &RawResponse, format: Format) -> Result<()> {
    match response.status {
        200 => Ok(()),
        400 => {
            let detail = error_detail(&response.body, format);
            Err(Error::Http {
                message: format!("{} (HTTP 400).", detail),
                status: 400,
            })
        }
        status => Err(Error::Http {
            message: format!(
                "The web service failed for an unknown reason (HTTP {}).",
                status
            ),
            status,
        }),
    }
}

fn error_detail(body: &str, format: Format) -> String {
    if format == Format::Json {
        if let Ok(data) = serde_json::from_str::<Value>(body) {
            for key in ["message", "error"] {
                if let Some(msg) = data.get(key).and_then(Value::as_str) {
                    return msg.to_string();
                }
            }
        }
    }
    body.trim().to_string()
}

pub fn user_agent(backend: &str) -> String {
    format!(
        "{}/{} ({})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        backend
    )
}

pub fn connection_error<E: std::fmt::Display>(err: E) -> Error {
    Error::Runtime(format!("An error occurred: {:#}.", err))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// reqwest based client
    Client,
    /// HTTP/1.1 written straight to a socket
    Stream,
}

impl Backend {
    pub fn detect(env_override: Option<&str>) -> Backend {
        match env_override {
            Some(value) if value.trim().eq_ignore_ascii_case("stream") => {
                debug!("Transport forced to stream backend by {}", TRANSPORT_ENV);
                Backend::Stream
            }
            _ => Backend::Client,
        }
    }

    pub fn from_env() -> Backend {
        let value = std::env::var(TRANSPORT_ENV).ok();
        Backend::detect(value.as_deref())
    }

    /// Inline payloads are only supported by the stream backend
    pub fn for_source(self, source: &ManifestSource) -> Backend {
        if source.is_inline() {
            Backend::Stream
        } else {
            self
        }
    }
}

pub fn build(backend: Backend, config: &TransportConfig) -> Result<Box<dyn Transport>> {
    let transport: Box<dyn Transport> = match backend {
        Backend::Client => Box::new(client::ClientTransport::new(config)?),
        Backend::Stream => Box::new(stream::StreamTransport::new(config)?),
    };
    Ok(transport)
}
