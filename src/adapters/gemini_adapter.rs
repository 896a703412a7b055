//! Gemini `generateContent` client.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::adapters::http::{api_key, build_client, send_json};
use crate::domain::error::DashboardError;
use crate::ports::config_port::ConfigPort;
use crate::ports::llm_port::LanguageModelPort;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
const PROVIDER: &str = "gemini";

pub struct GeminiAdapter {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiAdapter {
    pub fn new(
        api_key: String,
        model: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, DashboardError> {
        Ok(Self {
            client: build_client(PROVIDER, timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    /// `Ok(None)` when no API key is configured.
    pub fn from_config(
        config: &dyn ConfigPort,
        timeout: Duration,
    ) -> Result<Option<Self>, DashboardError> {
        let Some(key) = api_key(config, "gemini", API_KEY_ENV) else {
            tracing::warn!("{API_KEY_ENV} not set; AI synthesis and news summaries are disabled");
            return Ok(None);
        };
        let model = config
            .get_string("gemini", "model")
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = config
            .get_string("gemini", "base_url")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(key, &model, &base_url, timeout).map(Some)
    }
}

pub fn request_body(system_instruction: Option<&str>, prompt: &str) -> Value {
    let mut body = json!({
        "contents": [{"role": "user", "parts": [{"text": prompt}]}]
    });
    if let Some(system) = system_instruction {
        body["systemInstruction"] = json!({"parts": [{"text": system}]});
    }
    body
}

/// Concatenated text parts of the first candidate.
pub fn response_text(json: &Value) -> Option<String> {
    let parts = json.pointer("/candidates/0/content/parts")?.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}

#[async_trait]
impl LanguageModelPort for GeminiAdapter {
    async fn generate(
        &self,
        system_instruction: Option<&str>,
        prompt: &str,
    ) -> Result<String, DashboardError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(system_instruction, prompt));

        let json = send_json(PROVIDER, request)
            .await?
            .ok_or_else(|| DashboardError::upstream(PROVIDER, format!("model {} not found", self.model)))?;

        response_text(&json).ok_or_else(|| {
            let reason = json
                .pointer("/promptFeedback/blockReason")
                .and_then(Value::as_str)
                .map(|r| format!("response blocked: {r}"))
                .unwrap_or_else(|| "response contained no text".to_string());
            DashboardError::upstream(PROVIDER, reason)
        })
    }
}
