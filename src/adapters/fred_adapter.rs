//! FRED macroeconomic series provider.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::adapters::http::{api_key, build_client, send_json};
use crate::domain::error::DashboardError;
use crate::ports::config_port::ConfigPort;
use crate::ports::macro_port::MacroPort;

pub const DEFAULT_BASE_URL: &str = "https://api.stlouisfed.org/fred";
pub const API_KEY_ENV: &str = "FRED_API_KEY";
const PROVIDER: &str = "fred";

pub struct FredAdapter {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FredAdapter {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self, DashboardError> {
        Ok(Self {
            client: build_client(PROVIDER, timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// `Ok(None)` when no API key is configured.
    pub fn from_config(
        config: &dyn ConfigPort,
        timeout: Duration,
    ) -> Result<Option<Self>, DashboardError> {
        let Some(key) = api_key(config, "fred", API_KEY_ENV) else {
            tracing::warn!("{API_KEY_ENV} not set; macro endpoints are disabled");
            return Ok(None);
        };
        let base_url = config
            .get_string("fred", "base_url")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(key, &base_url, timeout).map(Some)
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, DashboardError> {
        let url = format!("{}/{}", self.base_url, path);
        let request = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("file_type", "json")])
            .query(params);
        send_json(PROVIDER, request)
            .await?
            .ok_or_else(|| DashboardError::upstream(PROVIDER, format!("{path}: not found")))
    }
}

/// Observations in response order. FRED marks missing values with `.`.
pub fn parse_observations(json: &Value) -> Vec<(NaiveDate, f64)> {
    json.get("observations")
        .and_then(Value::as_array)
        .map(|obs| {
            obs.iter()
                .filter_map(|o| {
                    let date = NaiveDate::parse_from_str(o.get("date")?.as_str()?, "%Y-%m-%d").ok()?;
                    let value = o.get("value")?.as_str()?.trim().parse::<f64>().ok()?;
                    value.is_finite().then_some((date, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_frequency(json: &Value) -> String {
    json.pointer("/seriess/0/frequency")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string()
}

#[async_trait]
impl MacroPort for FredAdapter {
    async fn observations(
        &self,
        series_id: &str,
        start: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, DashboardError> {
        let json = self
            .get(
                "series/observations",
                &[
                    ("series_id", series_id.to_string()),
                    ("observation_start", start.format("%Y-%m-%d").to_string()),
                ],
            )
            .await?;
        Ok(parse_observations(&json))
    }

    async fn latest_value(&self, series_id: &str) -> Result<Option<f64>, DashboardError> {
        let json = self
            .get(
                "series/observations",
                &[
                    ("series_id", series_id.to_string()),
                    ("sort_order", "desc".to_string()),
                    ("limit", "10".to_string()),
                ],
            )
            .await?;
        Ok(parse_observations(&json).first().map(|(_, v)| *v))
    }

    async fn frequency(&self, series_id: &str) -> Result<String, DashboardError> {
        let json = self
            .get("series", &[("series_id", series_id.to_string())])
            .await?;
        Ok(parse_frequency(&json))
    }
}
