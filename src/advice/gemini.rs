//! Gemini `generateContent` client.

use super::{AdviceError, AdviceProvider};
use crate::config::AdviceConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::time::Duration;

pub struct GeminiAdvisor {
    base_url: String,
    max_output_tokens: u32,
    client: reqwest::Client,
}

impl GeminiAdvisor {
    pub fn new(config: &AdviceConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_output_tokens: config.max_output_tokens,
            client,
        })
    }
}

/// Pull `error.message` out of a provider error body, if there is one.
fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(String::from)
}

/// Text of the first part of the first candidate.
fn extract_text(response: &Value) -> Result<String, AdviceError> {
    let candidate = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .ok_or_else(|| AdviceError::Upstream {
            status: "no candidates".into(),
            detail: None,
        })?;

    candidate
        .pointer("/content/parts/0/text")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| AdviceError::Upstream {
            status: "empty response".into(),
            detail: None,
        })
}

fn map_status(status: StatusCode, body: &str) -> AdviceError {
    let detail = extract_error_message(body);
    match status {
        StatusCode::TOO_MANY_REQUESTS => AdviceError::RateLimited(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AdviceError::InvalidCredential(detail),
        other => AdviceError::Upstream {
            status: other.as_u16().to_string(),
            detail,
        },
    }
}

#[async_trait]
impl AdviceProvider for GeminiAdvisor {
    async fn generate(&self, api_key: &str, model: &str, prompt: &str) -> Result<String, AdviceError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "maxOutputTokens": self.max_output_tokens },
        });

        let resp = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| AdviceError::Upstream {
                status: "request failed".into(),
                detail: Some(e.to_string()),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), model = %model, body = %text, "Gemini API error");
            return Err(map_status(status, &text));
        }

        let value: Value = resp.json().await.map_err(|e| AdviceError::Upstream {
            status: "invalid response".into(),
            detail: Some(e.to_string()),
        })?;
        extract_text(&value)
    }
}
