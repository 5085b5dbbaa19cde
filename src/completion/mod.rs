//! Completion client for the language-model service.
//!
//! Turns a list of role-tagged messages plus generation options into plain
//! text. The client owns model routing, fixed-interval rate limiting, retry of
//! transient failures, and normalization of the provider's reply shape.
//!
//! ## Per-call state machine
//!
//! `idle -> rate-limit wait -> in flight -> success`, or on a transient
//! failure `retry wait -> in flight` again, up to the configured attempt cap.

mod claude;
mod client;
mod response;
mod routing;

pub use claude::{ClaudeProvider, DEFAULT_API_VERSION, DEFAULT_BASE_URL};
pub use client::CompletionClient;
pub use response::extract_text;
pub use routing::{ModelRouting, GENERATION_MODEL, REASONING_MODEL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agents::AgentKind;

/// Role of a message fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A role-tagged message fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Generation options for one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    /// Agent kind, used to route to a model
    pub agent: AgentKind,

    /// Maximum output tokens
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Explicit model id, overriding routing
    pub model: Option<String>,
}

impl CompletionOptions {
    /// Create options for an agent kind.
    pub fn new(agent: AgentKind, max_tokens: u32, temperature: f32) -> Self {
        Self { agent, max_tokens, temperature, model: None }
    }

    /// Override the routed model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// A fully resolved request as sent to a provider.
///
/// The system fragment is split out; `messages` holds only user and
/// assistant turns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ProviderRequest {
    /// Build a request, separating the (single) system fragment.
    pub fn build(
        model: impl Into<String>,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> CompletionResult<Self> {
        let mut system = None;
        let mut turns = Vec::with_capacity(messages.len());

        for message in messages {
            match message.role {
                Role::System if system.is_some() => {
                    return Err(CompletionError::InvalidRequest(
                        "at most one system message is allowed".to_string(),
                    ));
                }
                Role::System => system = Some(message.content.clone()),
                Role::User | Role::Assistant => turns.push(message.clone()),
            }
        }

        if turns.is_empty() {
            return Err(CompletionError::InvalidRequest(
                "at least one user message is required".to_string(),
            ));
        }

        Ok(Self {
            model: model.into(),
            system,
            messages: turns,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        })
    }
}

/// Completion error types.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// No credential configured.
    #[error("Missing API credentials: set {0}")]
    MissingCredentials(String),

    /// Credential rejected by the provider.
    #[error("Authentication failed ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// Provider asked us to slow down.
    #[error("Rate limited by provider")]
    RateLimited {
        /// Seconds to wait, when the provider said so
        retry_after: Option<u64>,
    },

    /// Provider-side failure (5xx).
    #[error("Provider error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Request rejected for any other reason (4xx).
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Request could not be built.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Transport failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The per-call timeout elapsed.
    #[error("Request timed out")]
    Timeout,

    /// The reply contained no text.
    #[error("Provider returned an empty response")]
    EmptyResponse,

    /// The reply body could not be decoded.
    #[error("Unparseable provider response: {0}")]
    InvalidResponse(String),

    /// Every attempt failed.
    #[error("Completion failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<CompletionError> },
}

impl CompletionError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::Server { .. }
                | Self::Network(_)
                | Self::Timeout
                | Self::EmptyResponse
                | Self::InvalidResponse(_)
        )
    }

    /// Whether the failure is a credential problem the user must fix.
    pub fn is_auth(&self) -> bool {
        match self {
            Self::MissingCredentials(_) | Self::Unauthorized { .. } => true,
            Self::RetriesExhausted { last, .. } => last.is_auth(),
            _ => false,
        }
    }
}

/// Result type for completion operations.
pub type CompletionResult<T> = Result<T, CompletionError>;

/// A language-model backend.
///
/// Providers perform exactly one HTTP exchange per call and return the raw
/// reply; rate limiting, retry and text extraction belong to
/// [`CompletionClient`].
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send one request and return the provider's raw reply.
    async fn send(&self, request: &ProviderRequest) -> CompletionResult<serde_json::Value>;

    /// Provider name, for logs.
    fn name(&self) -> &str;
}
