use super::{connection_error, user_agent, Headers, Multipart, RawResponse, Request, Transport};
use super::{TransportConfig, MAX_REDIRECTS};
use crate::errors::*;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

lazy_static! {
    static ref STATUS_LINE: Regex = Regex::new(r"^HTTP/\d(?:\.\d)? (\d{3})").unwrap();
}

/// Upper bound for a single response, headers included
pub const MAX_RESPONSE_SIZE: usize = 8 * 1024 * 1024;

trait Connection: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Connection for T {}

/// Speaks HTTP/1.1 directly on a tcp (or tls) socket
pub struct StreamTransport {
    timeout: Duration,
    user_agent: String,
    tls: OnceLock<TlsConnector>,
}

impl StreamTransport {
    pub fn new(config: &TransportConfig) -> Result<StreamTransport> {
        Ok(StreamTransport {
            timeout: config.timeout,
            user_agent: user_agent("stream"),
            tls: OnceLock::new(),
        })
    }

    /// Root certificates are only loaded once the first https url shows up
    fn tls(&self) -> Result<TlsConnector> {
        if let Some(connector) = self.tls.get() {
            return Ok(connector.clone());
        }
        let connector = tls_connector()?;
        Ok(self.tls.get_or_init(|| connector).clone())
    }

    async fn follow(&self, request: &Request, form: Multipart) -> Result<RawResponse> {
        let mut url = Url::parse(&request.endpoint).map_err(connection_error)?;
        let boundary = form.boundary;
        let mut body = Some(form.body);
        let mut redirects = 0;

        loop {
            let response = self
                .exchange(&url, &request.headers, body.as_deref(), &boundary)
                .await?;

            let location = match response.status {
                301 | 302 | 303 | 307 | 308 => response.header("Location"),
                _ => None,
            };
            let Some(location) = location else {
                return Ok(response);
            };

            if redirects >= MAX_REDIRECTS {
                return Err(connection_error(format!(
                    "too many redirects ({})",
                    MAX_REDIRECTS
                )));
            }
            redirects += 1;

            url = url.join(location).map_err(connection_error)?;
            if matches!(response.status, 301 | 302 | 303) {
                body = None;
            }
            info!("Following redirect to {} (HTTP {})", url, response.status);
        }
    }

    async fn exchange(
        &self,
        url: &Url,
        headers: &Headers,
        body: Option<&[u8]>,
        boundary: &str,
    ) -> Result<RawResponse> {
        let host = url
            .host_str()
            .map(|host| host.trim_start_matches('[').trim_end_matches(']'))
            .ok_or_else(|| connection_error(format!("url has no host: {}", url)))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| connection_error(format!("url has no port: {}", url)))?;

        debug!("Connecting to {}:{}", host, port);
        let tcp = TcpStream::connect((host, port)).await.map_err(|err| {
            connection_error(format!("failed to connect to {}:{}: {}", host, port, err))
        })?;

        let mut conn: Box<dyn Connection> = match url.scheme() {
            "http" => Box::new(tcp),
            "https" => {
                let name = ServerName::try_from(host.to_string()).map_err(connection_error)?;
                let tls = self
                    .tls()?
                    .connect(name, tcp)
                    .await
                    .map_err(connection_error)?;
                Box::new(tls)
            }
            scheme => {
                return Err(connection_error(format!(
                    "unsupported url scheme {:?}",
                    scheme
                )))
            }
        };

        let head = request_head(url, headers, body, boundary, &self.user_agent)?;
        conn.write_all(head.as_bytes())
            .await
            .map_err(connection_error)?;
        if let Some(body) = body {
            conn.write_all(body).await.map_err(connection_error)?;
        }
        conn.flush().await.map_err(connection_error)?;

        let mut buf = Vec::new();
        read_to_close(&mut conn, &mut buf, MAX_RESPONSE_SIZE).await?;
        debug!("Read {} bytes from {}:{}", buf.len(), host, port);

        parse_response(&buf)
    }
}

#[async_trait]
impl Transport for StreamTransport {
    fn name(&self) -> &'static str {
        "stream"
    }

    async fn execute(&self, request: &Request) -> Result<RawResponse> {
        let form = Multipart::new(request.filename(), &request.manifest);

        match tokio::time::timeout(self.timeout, self.follow(request, form)).await {
            Ok(response) => response,
            Err(_) => Err(connection_error(format!(
                "operation timed out after {} seconds",
                self.timeout.as_secs_f64()
            ))),
        }
    }
}

fn tls_connector() -> Result<TlsConnector> {
    let certs = rustls_native_certs::load_native_certs();
    for err in &certs.errors {
        warn!("Failed to load a system root certificate: {}", err);
    }

    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certs.certs);
    debug!(
        "Loaded {} system root certificates ({} ignored)",
        added, ignored
    );
    if added == 0 {
        return Err(connection_error("no trusted root certificates found"));
    }

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

fn request_head(
    url: &Url,
    headers: &Headers,
    body: Option<&[u8]>,
    boundary: &str,
    user_agent: &str,
) -> Result<String> {
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut host = url.host_str().unwrap_or_default().to_string();
    if let Some(port) = url.port() {
        host.push_str(&format!(":{}", port));
    }

    let method = if body.is_some() { "POST" } else { "GET" };
    let mut head = format!("{} {} HTTP/1.1\r\n", method, target);
    head.push_str(&format!("Host: {}\r\n", host));
    head.push_str(&format!("User-Agent: {}\r\n", user_agent));
    head.push_str("Connection: close\r\n");
    if let Some(body) = body {
        head.push_str(&format!(
            "Content-Type: multipart/form-data; boundary={}\r\n",
            boundary
        ));
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }

    for (key, value) in headers {
        if [key, value].iter().any(|s| s.contains(['\r', '\n'])) || key.contains(':') {
            return Err(Error::runtime(format!("Invalid header: {:?}", key)));
        }
        head.push_str(&format!("{}: {}\r\n", key, value));
    }
    head.push_str("\r\n");

    Ok(head)
}

async fn read_to_close<R: AsyncRead + Unpin + ?Sized>(
    conn: &mut R,
    buf: &mut Vec<u8>,
    limit: usize,
) -> Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
        match conn.read(&mut chunk).await {
            Ok(0) => return Ok(()),
            Ok(n) if buf.len() + n > limit => {
                return Err(connection_error(format!(
                    "response exceeds {} bytes",
                    limit
                )))
            }
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            // servers regularly close tls sessions without close_notify
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(err) => return Err(connection_error(err)),
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

pub fn parse_response(mut data: &[u8]) -> Result<RawResponse> {
    loop {
        let split = find(data, b"\r\n\r\n").ok_or_else(|| Error::runtime("An unknown error occurred."))?;
        let head = String::from_utf8_lossy(&data[..split]);
        let rest = &data[split + 4..];

        let mut lines = head.split("\r\n");
        let status = lines
            .next()
            .and_then(|line| STATUS_LINE.captures(line))
            .and_then(|caps| caps[1].parse::<u16>().ok())
            .ok_or_else(|| Error::runtime("An unknown error occurred."))?;

        if (100..200).contains(&status) {
            data = rest;
            continue;
        }

        let headers: Headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();

        let mut response = RawResponse {
            status,
            headers,
            body: String::new(),
        };

        let chunked = response
            .header("Transfer-Encoding")
            .map(|value| value.to_ascii_lowercase().contains("chunked"))
            .unwrap_or(false);
        let body = if chunked {
            decode_chunked(rest)?
        } else if let Some(len) = response
            .header("Content-Length")
            .and_then(|value| value.parse::<usize>().ok())
        {
            rest[..len.min(rest.len())].to_vec()
        } else {
            rest.to_vec()
        };

        response.body = String::from_utf8_lossy(&body).into_owned();
        return Ok(response);
    }
}

fn decode_chunked(mut data: &[u8]) -> Result<Vec<u8>> {
    let invalid = || Error::runtime("An error occurred: invalid chunked response body.");
    let mut out = Vec::new();

    loop {
        let line_end = find(data, b"\r\n").ok_or_else(invalid)?;
        let line = std::str::from_utf8(&data[..line_end]).map_err(|_| invalid())?;
        let size = line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size, 16).map_err(|_| invalid())?;
        data = &data[line_end + 2..];

        if size == 0 {
            return Ok(out);
        }
        if data.len() < size {
            return Err(invalid());
        }
        out.extend_from_slice(&data[..size]);
        data = data.get(size + 2..).unwrap_or_default();
    }
}
