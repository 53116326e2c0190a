//! Task advice from an external text-generation provider.
//!
//! The tree core never depends on this module; task workflows call
//! [`get_advice`] with a title, optional notes and a request kind.

pub mod gemini;

use crate::config::AdviceConfig;
use crate::db::settings::AdviceSettings;
use crate::error::{TreeError, TreeResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use gemini::GeminiAdvisor;

/// Notes longer than this many characters are cut before prompting.
pub const MAX_TASK_CONTENT_CHARS: usize = 500;

const TRUNCATION_MARKER: &str = "... (truncated)";

const BREAKDOWN_PROMPT: &str = "\
You are a task management coach.
Break the task the user is about to start into small, concrete steps.

Rules:
- Use 3 to 7 steps
- Each step should take 15 minutes or less
- Answer as a numbered list
- Make the first step especially easy to start
- Be brief and skip any preamble";

const ENCOURAGEMENT_PROMPT: &str = "\
You are a warm, upbeat task management coach.
Encourage the user about the task they are working on right now.

Rules:
- Two or three sentences
- Refer to the specific task to show you understand it
- Include a clear \"you can do this\" message
- Skip any preamble";

const REVIEW_PROMPT: &str = "\
You are a task management coach.
The user just finished a task. Give short feedback and suggest what to do next.

Rules:
- Start by celebrating the completion in one sentence
- Then suggest exactly one good next action
- Be brief and skip any preamble";

/// Which guidance template to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceKind {
    Breakdown,
    Encouragement,
    Review,
}

impl AdviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdviceKind::Breakdown => "breakdown",
            AdviceKind::Encouragement => "encouragement",
            AdviceKind::Review => "review",
        }
    }

    fn template(&self) -> &'static str {
        match self {
            AdviceKind::Breakdown => BREAKDOWN_PROMPT,
            AdviceKind::Encouragement => ENCOURAGEMENT_PROMPT,
            AdviceKind::Review => REVIEW_PROMPT,
        }
    }
}

impl fmt::Display for AdviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdviceKind {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breakdown" => Ok(AdviceKind::Breakdown),
            "encouragement" => Ok(AdviceKind::Encouragement),
            "review" => Ok(AdviceKind::Review),
            other => Err(TreeError::invalid_value(
                "requestType",
                format!("Unknown request type: {}", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceRequest {
    pub task_title: String,
    #[serde(default)]
    pub task_content: Option<String>,
    pub request_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceResponse {
    pub advice: String,
    pub request_type: String,
}

/// Provider failures, as surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum AdviceError {
    #[error("No API key is configured for the advice provider")]
    NotConfigured,

    #[error("Advice provider rate limit reached, try again later{}", detail_suffix(.0))]
    RateLimited(Option<String>),

    #[error("Advice provider rejected the API key{}", detail_suffix(.0))]
    InvalidCredential(Option<String>),

    #[error("Advice provider error ({status}){}", detail_suffix(.detail))]
    Upstream { status: String, detail: Option<String> },
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) if !d.is_empty() => format!(" [details: {}]", d),
        _ => String::new(),
    }
}

impl AdviceError {
    /// Stable code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            AdviceError::NotConfigured => "API_KEY_NOT_CONFIGURED",
            AdviceError::RateLimited(_) => "RATE_LIMITED",
            AdviceError::InvalidCredential(_) => "INVALID_API_KEY",
            AdviceError::Upstream { .. } => "API_ERROR",
        }
    }
}

impl From<AdviceError> for TreeError {
    fn from(err: AdviceError) -> Self {
        TreeError::upstream(err.code(), err.to_string())
    }
}

/// Key and model used for one provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdviceCredentials {
    pub api_key: Option<String>,
    pub model: String,
}

impl AdviceCredentials {
    /// Stored settings win over config; blank stored values fall through.
    pub fn resolve(settings: Option<&AdviceSettings>, config: &AdviceConfig) -> Self {
        let non_blank = |s: &Option<String>| s.clone().filter(|v| !v.trim().is_empty());

        let api_key = settings
            .and_then(|s| non_blank(&s.api_key))
            .or_else(|| non_blank(&config.api_key));
        let model = settings
            .map(|s| s.model.clone())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| config.model.clone());

        Self { api_key, model }
    }
}

/// Stored settings as shown to a user: the key is masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub api_key: String,
    pub model: String,
    pub has_api_key: bool,
}

impl From<&AdviceSettings> for SettingsView {
    fn from(settings: &AdviceSettings) -> Self {
        let key = settings.api_key.as_deref().unwrap_or_default();
        Self {
            api_key: mask_api_key(key),
            model: settings.model.clone(),
            has_api_key: !key.trim().is_empty(),
        }
    }
}

/// First and last four characters around `****`. Short keys mask to nothing.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return String::new();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}

/// A text-generation backend.
#[async_trait]
pub trait AdviceProvider: Send + Sync {
    /// Generate text for `prompt` using the given key and model.
    async fn generate(&self, api_key: &str, model: &str, prompt: &str) -> Result<String, AdviceError>;
}

/// Build the full prompt for a request.
pub fn build_prompt(kind: AdviceKind, task_title: &str, task_content: Option<&str>) -> String {
    let mut prompt = String::from(kind.template());
    prompt.push_str("\n\nTask: ");
    prompt.push_str(task_title);

    if let Some(content) = task_content.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\nTask notes:\n");
        if content.chars().count() > MAX_TASK_CONTENT_CHARS {
            prompt.extend(content.chars().take(MAX_TASK_CONTENT_CHARS));
            prompt.push_str(TRUNCATION_MARKER);
        } else {
            prompt.push_str(content);
        }
    }

    prompt
}

/// Ask `provider` for guidance on a task.
pub async fn get_advice<P>(
    provider: &P,
    credentials: &AdviceCredentials,
    request: &AdviceRequest,
) -> TreeResult<AdviceResponse>
where
    P: AdviceProvider + ?Sized,
{
    if request.task_title.trim().is_empty() {
        return Err(TreeError::missing_field("taskTitle"));
    }
    if request.request_type.trim().is_empty() {
        return Err(TreeError::missing_field("requestType"));
    }
    let Some(api_key) = credentials.api_key.as_deref() else {
        return Err(AdviceError::NotConfigured.into());
    };

    let kind: AdviceKind = request.request_type.parse()?;
    let prompt = build_prompt(kind, &request.task_title, request.task_content.as_deref());

    tracing::debug!(kind = %kind, model = %credentials.model, "Requesting advice");
    let advice = provider
        .generate(api_key, &credentials.model, &prompt)
        .await
        .inspect_err(|e| tracing::warn!(code = e.code(), error = %e, "Advice request failed"))?;

    Ok(AdviceResponse {
        advice,
        request_type: kind.as_str().to_string(),
    })
}
