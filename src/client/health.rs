//! Service status via: GET {endpoint}/health and GET {endpoint}/

use super::{status_error, TransportError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Response of the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub ml_model_loaded: bool,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Service banner returned by the root endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub endpoints: Vec<String>,
}

pub async fn health(
    client: &Client,
    base_url: &str,
    timeout: Duration,
) -> Result<HealthStatus, TransportError> {
    get_json(client, &format!("{}/health", base_url), timeout).await
}

pub async fn info(
    client: &Client,
    base_url: &str,
    timeout: Duration,
) -> Result<ServiceInfo, TransportError> {
    get_json(client, &format!("{}/", base_url), timeout).await
}

async fn get_json<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<T, TransportError> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(TransportError::from_reqwest)?;

    if !response.status().is_success() {
        return Err(status_error(response).await);
    }

    response.json().await.map_err(TransportError::from_reqwest)
}
