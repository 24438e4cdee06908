//! Analysis submission via: POST {endpoint}/analyze

use super::{status_error, AnalysisRequest, TransportError};
use reqwest::Client;
use std::time::Duration;

/// Submit code for analysis and return the raw success body.
pub async fn submit(
    client: &Client,
    base_url: &str,
    request: &AnalysisRequest,
    timeout: Duration,
) -> Result<String, TransportError> {
    let url = format!("{}/analyze", base_url);

    let response = client
        .post(&url)
        .timeout(timeout)
        .json(request)
        .send()
        .await
        .map_err(TransportError::from_reqwest)?;

    if !response.status().is_success() {
        return Err(status_error(response).await);
    }

    response.text().await.map_err(TransportError::from_reqwest)
}
