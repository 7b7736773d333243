//! Outbound transports
//!
//! [`SystemTransport`] is the seam between the invoker and the network.
//! [`ReqwestTransport`] is the production implementation; [`MockTransport`]
//! replays queued responses and records what was sent.
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use super::error::HttpError;
use super::invoker::InvokerConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// A fully prepared outbound call
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub timeout: Duration,
}

/// A reply, with header names lowercased
#[derive(Debug, Clone, PartialEq)]
pub struct InboundResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl InboundResponse {
    pub fn new(status: u16, content_type: &str, body: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), content_type.to_string());
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn retry_after(&self) -> Option<u64> {
        self.header("retry-after").and_then(|v| v.trim().parse().ok())
    }
}

/// Sends prepared requests
#[async_trait]
pub trait SystemTransport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> std::result::Result<InboundResponse, HttpError>;
}

/// Transport backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &InvokerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Http {
                message: format!("Failed to create HTTP client: {}", e),
                status_code: None,
                source: None,
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SystemTransport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> std::result::Result<InboundResponse, HttpError> {
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| HttpError::network(format!("invalid method '{}': {}", request.method, e)))?;

        let mut builder = self.client.request(method, &request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .body(request.body)
            .send()
            .await
            .map_err(HttpError::from_request_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(HttpError::from_request_error)?;

        Ok(InboundResponse { status, headers, body })
    }
}

/// Transport that replays queued responses
///
/// Responses are returned in the order they were queued; when the queue is
/// empty, calls fail with a network error. Every request is recorded.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<std::result::Result<InboundResponse, HttpError>>>,
    requests: Mutex<Vec<OutboundRequest>>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw response
    pub fn respond(self, response: InboundResponse) -> Self {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Ok(response));
        }
        self
    }

    /// Queue a JSON response
    pub fn respond_json(self, status: u16, body: &Value) -> Self {
        self.respond(InboundResponse::new(status, "application/json", body.to_string()))
    }

    /// Queue a transport failure
    pub fn fail(self, error: HttpError) -> Self {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Err(error));
        }
        self
    }

    /// Wait this long before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests sent so far
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SystemTransport for MockTransport {
    async fn send(&self, request: OutboundRequest) -> std::result::Result<InboundResponse, HttpError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = match self.responses.lock() {
            Ok(mut queue) => queue.pop_front(),
            Err(_) => None,
        };
        next.unwrap_or_else(|| Err(HttpError::network("no mock response queued")))
    }
}
