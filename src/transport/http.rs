//! HTTP transport over reqwest

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::call_log::{CallLog, CurlRequest};
use super::{is_dot_segment, Method, Transport};
use crate::cancel::CancelSignal;
use crate::config::ExplorerConfig;
use crate::error::{TransportError, TransportResult};

/// Longest slice of an error body kept in [`TransportError::Status`]
const ERROR_BODY_LIMIT: usize = 200;

/// Graph API client
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    call_log: Arc<CallLog>,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> TransportResult<Self> {
        Self::with_call_log(base_url, timeout, Arc::new(CallLog::default()))
    }

    pub fn from_config(config: &ExplorerConfig) -> TransportResult<Self> {
        Self::with_call_log(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
            Arc::new(CallLog::new(config.call_log_capacity)),
        )
    }

    pub fn with_call_log(
        base_url: &str,
        timeout: Duration,
        call_log: Arc<CallLog>,
    ) -> TransportResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            call_log,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Shared handle to the API call history
    pub fn call_log(&self) -> Arc<CallLog> {
        Arc::clone(&self.call_log)
    }

    fn url_for(&self, path: &str) -> TransportResult<String> {
        let url = format!("{}{}", self.base_url, path);
        let invalid = |message: String| TransportError::InvalidUrl {
            url: url.clone(),
            message,
        };

        // URL parsing would resolve a dot segment into a different endpoint
        let request_path = path.split('?').next().unwrap_or_default();
        if request_path.split('/').any(is_dot_segment) {
            return Err(invalid("dot segment in request path".to_string()));
        }

        reqwest::Url::parse(&url).map_err(|e| invalid(e.to_string()))?;
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        signal: &CancelSignal,
    ) -> TransportResult<Value> {
        if signal.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        let url = self.url_for(path)?;

        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        let call_id = self.call_log.record(&CurlRequest {
            url: url.clone(),
            method: method.to_string(),
            headers,
            body: body.cloned(),
        });

        let request = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url).json(body.unwrap_or(&Value::Null)),
        }
        .header(reqwest::header::ACCEPT, "application/json");

        tracing::debug!(%method, url = %url, "graph API request");
        let started = Instant::now();
        let (status, outcome) = Self::execute(request).await;
        let elapsed = started.elapsed().as_millis() as u64;

        let error = outcome.as_ref().err().map(ToString::to_string);
        if let Some(error) = &error {
            tracing::debug!(%method, url = %url, error = %error, "graph API request failed");
        }
        self.call_log.update(&call_id, status, Some(elapsed), error);

        outcome
    }

    /// Send the request; the status is reported whenever a response arrived
    async fn execute(request: reqwest::RequestBuilder) -> (Option<u16>, TransportResult<Value>) {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return (None, Err(e.into())),
        };
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = TransportError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            };
            return (Some(status.as_u16()), Err(error));
        }

        let value = match response.text().await {
            Ok(text) => {
                serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))
            }
            Err(e) => Err(e.into()),
        };
        (Some(status.as_u16()), value)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        path: &str,
        body: &Value,
        signal: &CancelSignal,
    ) -> TransportResult<Value> {
        self.send(Method::Post, path, Some(body), signal).await
    }

    async fn get(&self, path: &str, signal: &CancelSignal) -> TransportResult<Value> {
        self.send(Method::Get, path, None, signal).await
    }
}
