//! The [`Transport`] trait: the raw GET/POST contract with the code service.
//!
//! Implementations issue exactly one request per call. No retries and no
//! timeout beyond the transport's own default; any failure comes back as a
//! single [`TransportError`]. Higher layers never see status codes except
//! through that error.

use std::future::Future;

use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::TransportError;

/// Raw JSON request contract with the code service.
///
/// Futures are `Send` so components can be driven from spawned tasks.
pub trait Transport: Send + Sync + 'static {
    /// GET `path` with the given query parameters.
    fn get(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;

    /// POST `body` as JSON to `path`.
    fn post(
        &self,
        path: &str,
        body: &Value,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;
}

/// [`Transport`] over HTTP using a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    config: ClientConfig,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Self {
        HttpTransport {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Transport for HttpTransport {
    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, TransportError> {
        let url = self.config.endpoint(path);
        tracing::debug!(%url, "GET");
        let response = self.client.get(&url).query(params).send().await?;
        read_json(response).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, TransportError> {
        let url = self.config.endpoint(path);
        tracing::debug!(%url, "POST");
        let response = self.client.post(&url).json(body).send().await?;
        read_json(response).await
    }
}

/// Reads a response body as JSON.
///
/// Non-2xx statuses are errors regardless of body. An empty body is `null`;
/// a body that is not JSON is returned as a JSON string of its text.
async fn read_json(response: reqwest::Response) -> Result<Value, TransportError> {
    let status = response.status();
    let body_text = response.text().await?;

    if !status.is_success() {
        return Err(TransportError::with_status(
            status.as_u16(),
            format!("request failed ({}): {}", status, body_text.trim()),
        ));
    }

    let trimmed = body_text.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string())))
}
