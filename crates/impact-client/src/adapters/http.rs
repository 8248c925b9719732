//! HTTP transport over reqwest (rustls).

use async_trait::async_trait;
use std::time::Duration;
use tracing::trace;

use crate::domain::RawResponse;
use crate::error::{ConfigError, TransportError};
use crate::ports::Transport;

/// `User-Agent` sent with every request
pub const USER_AGENT: &str = concat!("impact-client/", env!("CARGO_PKG_VERSION"));

/// Form-POST transport backed by a pooled `reqwest::Client`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connection(e.to_string())
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<RawResponse, TransportError> {
        trace!(url = url, fields = form.len(), "POST");
        let response = self.client.post(url).form(form).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse::new(status, body))
    }
}
