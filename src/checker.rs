use crate::errors::*;
use crate::format::Format;
use crate::manifest;
use crate::response::{self, CheckResult};
use crate::transport::{self, Backend, Headers, Request, TransportConfig};
use std::time::Duration;

/// Submits lock files to the advisory service
pub struct Checker {
    config: TransportConfig,
    backend: Backend,
    headers: Headers,
    last_count: Option<u64>,
}

impl Checker {
    pub fn new(config: TransportConfig, backend: Backend) -> Checker {
        Checker {
            config,
            backend,
            headers: Vec::new(),
            last_count: None,
        }
    }

    /// Use the backend selected by the environment
    pub fn from_env(config: TransportConfig) -> Checker {
        Checker::new(config, Backend::from_env())
    }

    pub fn set_endpoint<S: Into<String>>(&mut self, endpoint: S) {
        self.config.endpoint = endpoint.into();
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    pub fn set_token(&mut self, token: &str) {
        self.add_header("Authorization", &format!("Token {}", token));
    }

    /// Add a header sent with every request
    pub fn add_header(&mut self, key: &str, value: &str) {
        self.headers.push((key.to_string(), value.to_string()));
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Alert count of the most recent successful check
    pub fn last_vulnerability_count(&self) -> Option<u64> {
        self.last_count
    }

    pub async fn check(
        &mut self,
        lock: &str,
        format: Format,
        extra_headers: &[(String, String)],
    ) -> Result<CheckResult> {
        self.last_count = None;

        let source = manifest::resolve(lock)?;
        let payload = manifest::normalize(&source.read()?)?;

        let backend = self.backend.for_source(&source);
        let transport = transport::build(backend, &self.config)?;

        let request = Request::new(
            &self.config.endpoint,
            payload,
            format,
            &self.headers,
            extra_headers,
        );
        let response = transport.send(&request, format).await?;
        let result = response::decode(&response, format)?;

        self.last_count = Some(result.count());
        Ok(result)
    }
}
