//! Shared reqwest plumbing for the provider adapters.

use crate::domain::error::DashboardError;
use crate::ports::config_port::ConfigPort;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

/// `[section] api_key`, falling back to the environment variable.
pub fn api_key(config: &dyn ConfigPort, section: &str, env_var: &str) -> Option<String> {
    config
        .get_string(section, "api_key")
        .or_else(|| std::env::var(env_var).ok())
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

pub fn build_client(provider: &str, timeout: Duration) -> Result<Client, DashboardError> {
    Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| DashboardError::upstream(provider, e))
}

/// Sends the request and decodes a JSON body. A 404 yields `None`; any
/// other non-success status is an error carrying the response text.
pub async fn send_json(
    provider: &str,
    request: RequestBuilder,
) -> Result<Option<Value>, DashboardError> {
    let response = request
        .send()
        .await
        .map_err(|e| DashboardError::upstream(provider, e))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        return Err(DashboardError::upstream(
            provider,
            format!("HTTP {status}: {snippet}"),
        ));
    }

    response
        .json::<Value>()
        .await
        .map(Some)
        .map_err(|e| DashboardError::upstream(provider, e))
}
