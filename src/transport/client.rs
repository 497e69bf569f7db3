use super::{connection_error, user_agent, Multipart, RawResponse, Request, Transport};
use super::{TransportConfig, MAX_REDIRECTS};
use crate::errors::*;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::Client;

fn request_error(err: reqwest::Error) -> Error {
    connection_error(format!("{:#}", anyhow::Error::from(err)))
}

pub struct ClientTransport {
    client: Client,
}

impl ClientTransport {
    pub fn new(config: &TransportConfig) -> Result<ClientTransport> {
        let client = Client::builder()
            .user_agent(user_agent("client"))
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .redirect(Policy::custom(|attempt| {
                // previous urls include the one that answered with this redirect
                if attempt.previous().len() > MAX_REDIRECTS {
                    attempt.error(format!("too many redirects ({})", MAX_REDIRECTS))
                } else {
                    attempt.follow()
                }
            }))
            .build()
            .map_err(request_error)?;
        Ok(ClientTransport { client })
    }
}

#[async_trait]
impl Transport for ClientTransport {
    fn name(&self) -> &'static str {
        "client"
    }

    async fn execute(&self, request: &Request) -> Result<RawResponse> {
        // a buffered body can be replayed on 307/308, a streamed form can't
        let form = Multipart::new(request.filename(), &request.manifest);
        let mut builder = self
            .client
            .post(&request.endpoint)
            .header(CONTENT_TYPE, form.content_type());
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let response = builder
            .body(form.body)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(key, value)| {
                let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
                (key.as_str().to_string(), value)
            })
            .collect();
        let body = response.text().await.map_err(request_error)?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
