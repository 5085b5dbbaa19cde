//! Anthropic Messages API provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use super::{CompletionError, CompletionProvider, CompletionResult, ProviderRequest, Role};

/// Messages API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";

/// `anthropic-version` header value.
pub const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Environment variable holding the API key.
const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Claude API provider.
pub struct ClaudeProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    api_version: String,
}

impl ClaudeProvider {
    /// Create a new Claude provider.
    ///
    /// Reads API key from ANTHROPIC_API_KEY environment variable.
    pub fn new() -> CompletionResult<Self> {
        Self::from_env(API_KEY_ENV, Duration::from_secs(120))
    }

    /// Create a provider reading its key from `var`, with a per-call timeout.
    pub fn from_env(var: &str, timeout: Duration) -> CompletionResult<Self> {
        let api_key = std::env::var(var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CompletionError::MissingCredentials(var.to_string()))?;

        Self::with_api_key(api_key, timeout)
    }

    /// Create a provider with an explicit key.
    pub fn with_api_key(api_key: impl Into<String>, timeout: Duration) -> CompletionResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CompletionError::MissingCredentials(API_KEY_ENV.to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            endpoint: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        })
    }

    /// Use a different endpoint (proxies, test servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Use a different `anthropic-version`.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }
}

#[async_trait]
impl CompletionProvider for ClaudeProvider {
    async fn send(&self, request: &ProviderRequest) -> CompletionResult<serde_json::Value> {
        let body = ClaudeRequest::from(request);

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, retry_after, &body));
        }

        response.json().await.map_err(|e| CompletionError::InvalidResponse(e.to_string()))
    }

    fn name(&self) -> &str {
        "claude"
    }
}

fn map_transport_error(error: reqwest::Error) -> CompletionError {
    if error.is_timeout() {
        CompletionError::Timeout
    } else {
        CompletionError::Network(error.to_string())
    }
}

/// Map a non-success HTTP status to an error kind.
fn classify_status(status: StatusCode, retry_after: Option<u64>, body: &str) -> CompletionError {
    let message = error_message(body);
    let code = status.as_u16();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            CompletionError::Unauthorized { status: code, message }
        }
        StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimited { retry_after },
        s if s.is_server_error() => CompletionError::Server { status: code, message },
        _ => CompletionError::Rejected { status: code, message },
    }
}

/// Prefer the provider's `error.message`; fall back to a truncated raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error")?.get("message")?.as_str().map(String::from))
        .unwrap_or_else(|| body.chars().take(300).collect())
}

/// Claude API request structure.
#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

/// Message in a Claude request.
#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a ProviderRequest> for ClaudeRequest<'a> {
    fn from(request: &'a ProviderRequest) -> Self {
        let messages = request
            .messages
            .iter()
            .map(|m| Message {
                role: if m.role == Role::Assistant { "assistant" } else { "user" },
                content: &m.content,
            })
            .collect();

        Self {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.as_deref(),
            messages,
        }
    }
}
