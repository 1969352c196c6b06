//! Google Gemini provider implementation

use super::{CompletionBackend, CompletionOutcome, LlmConfig, RetryDelay};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const DIRECT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const RETRY_INFO_TYPE: &str = "type.googleapis.com/google.rpc.RetryInfo";
const QUOTA_STATUS: &str = "RESOURCE_EXHAUSTED";

/// Gemini service implementation
pub struct GeminiBackend {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model_id: String,
}

impl GeminiBackend {
    pub fn new(config: &LlmConfig) -> Result<Self, reqwest::Error> {
        let base = config
            .gateway
            .as_deref()
            .unwrap_or(DIRECT_BASE_URL)
            .trim_end_matches('/');
        let endpoint = format!("{base}/v1beta/models/{}:generateContent", config.model);

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint,
            model_id: config.model.clone(),
        })
    }

    fn build_request(prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(prompt.to_string()),
                }],
            }],
        }
    }

    fn normalize_response(resp: GeminiResponse) -> CompletionOutcome {
        if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
            return CompletionOutcome::provider_error(format!("Prompt blocked: {reason}"));
        }

        if let Some(usage) = &resp.usage_metadata {
            tracing::debug!(
                input_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "Gemini usage"
            );
        }

        // Only the first candidate is used; non-text parts are ignored
        let text = resp
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        CompletionOutcome::Success(text)
    }
}

/// Classify a non-2xx Gemini response
fn classify_error(status: StatusCode, body: &str) -> CompletionOutcome {
    let Ok(error_resp) = serde_json::from_str::<GeminiErrorResponse>(body) else {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return CompletionOutcome::QuotaExceeded { retry_after: None };
        }
        return CompletionOutcome::provider_error(format!("HTTP {status} error: {body}"));
    };

    let error = error_resp.error;
    let quota = status == StatusCode::TOO_MANY_REQUESTS
        || error.status.as_deref() == Some(QUOTA_STATUS);

    if quota {
        return CompletionOutcome::QuotaExceeded {
            retry_after: extract_retry_delay(&error.details),
        };
    }

    let cause = match status.as_u16() {
        400 => format!("Invalid request: {}", error.message),
        401 | 403 => format!("Authentication failed: {}", error.message),
        500..=599 => format!("Server error: {}", error.message),
        _ => format!("HTTP {status}: {}", error.message),
    };
    CompletionOutcome::ProviderError { cause }
}

/// Find the `RetryInfo` entry in a `google.rpc.Status` detail list
fn extract_retry_delay(details: &[Value]) -> Option<RetryDelay> {
    details
        .iter()
        .find(|d| d.get("@type").and_then(Value::as_str) == Some(RETRY_INFO_TYPE))
        .and_then(|d| d.get("retryDelay"))
        .and_then(Value::as_str)
        .map(RetryDelay::new)
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    async fn complete(&self, prompt: &str) -> CompletionOutcome {
        let request = Self::build_request(prompt);

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-goog-api-key", key);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return CompletionOutcome::provider_error(format!("Request timeout: {e}"))
            }
            Err(e) if e.is_connect() => {
                return CompletionOutcome::provider_error(format!("Connection failed: {e}"))
            }
            Err(e) => return CompletionOutcome::provider_error(format!("Request failed: {e}")),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return CompletionOutcome::provider_error(format!(
                    "Failed to read response: {e}"
                ))
            }
        };

        if !status.is_success() {
            return classify_error(status, &body);
        }

        match serde_json::from_str::<GeminiResponse>(&body) {
            Ok(parsed) => Self::normalize_response(parsed),
            Err(e) => CompletionOutcome::provider_error(format!(
                "Failed to parse response: {e} - body: {body}"
            )),
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    #[serde(default)]
    message: String,
    status: Option<String>,
    #[serde(default)]
    details: Vec<Value>,
}
