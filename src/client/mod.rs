//! Client for the remote analysis service.
//!
//! The session only talks to the service through the [`Transport`] trait so
//! tests can substitute a scripted fake. [`ServiceClient`] is the HTTP
//! implementation:
//! - `POST /analyze` submits code and returns the raw response body
//! - `GET /health` and `GET /` report service status

mod analyze;
mod health;

pub use health::{HealthStatus, ServiceInfo};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::buffer::Language;
use crate::config::Config;

/// Errors that can occur talking to the analysis service.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("analysis service returned HTTP {code}{}", detail_suffix(.detail))]
    Status { code: u16, detail: Option<String> },
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}

impl TransportError {
    /// Classify a reqwest failure, splitting out timeouts.
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Network(e)
        }
    }
}

/// Body of an analysis request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub code: String,
    pub language: Language,
}

/// Something that can carry an analysis request to the service.
///
/// Returns the raw success body; validation is the caller's job.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, TransportError>;
}

/// HTTP client for the analysis service.
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ServiceClient {
    /// Create a new client from configuration.
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let base_url = config.base_url().to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(TransportError::InvalidEndpoint(base_url));
        }

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent())
            .build()?;

        Ok(Self {
            http,
            base_url,
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query `GET /health`.
    pub async fn health(&self) -> Result<HealthStatus, TransportError> {
        health::health(&self.http, &self.base_url, self.timeout).await
    }

    /// Query `GET /` for the service banner.
    pub async fn info(&self) -> Result<ServiceInfo, TransportError> {
        health::info(&self.http, &self.base_url, self.timeout).await
    }
}

#[async_trait]
impl Transport for ServiceClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, TransportError> {
        analyze::submit(&self.http, &self.base_url, request, self.timeout).await
    }
}

/// Turn a non-success response into a [`TransportError::Status`], pulling
/// the `detail` message out of the body when the service sent one.
pub(crate) async fn status_error(response: reqwest::Response) -> TransportError {
    let code = response.status().as_u16();
    let detail = response
        .text()
        .await
        .ok()
        .and_then(|body| error_detail(&body));
    TransportError::Status { code, detail }
}

/// Extract `detail` from a `{"detail": ...}` error body.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
