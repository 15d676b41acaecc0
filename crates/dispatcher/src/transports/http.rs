//! HttpTransport - reqwest-backed JSON POST

use bytes::Bytes;
use contracts::{ClientConfig, ContractError, Transport, TransportResponse};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::DispatcherError;

/// Transport that POSTs to `<endpoint><path>` over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: String,
    client: Client,
}

impl HttpTransport {
    /// Create a transport for `endpoint` with a per-request timeout
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DispatcherError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("objects-dispatch/{}", crate::VERSION))
            .build()
            .map_err(DispatcherError::HttpClient)?;

        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        debug!(endpoint = %endpoint, timeout_ms = timeout.as_millis() as u64, "HttpTransport created");

        Ok(Self { endpoint, client })
    }

    /// Create from endpoint and request timeout of a `ClientConfig`
    pub fn from_config(config: &ClientConfig) -> Result<Self, DispatcherError> {
        Self::new(&config.endpoint, config.request_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(name = "http_transport_post", skip(self, body), fields(bytes = body.len()))]
    async fn post_json(
        &self,
        path: &str,
        body: Bytes,
    ) -> Result<TransportResponse, ContractError> {
        let response = self
            .client
            .post(self.url(path))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ContractError::transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        debug!(status, "Response received");

        Ok(TransportResponse { status, body })
    }
}
