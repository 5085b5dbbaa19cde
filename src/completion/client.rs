//! Rate-limited, retrying completion client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use super::{
    extract_text, ChatMessage, ClaudeProvider, CompletionError, CompletionOptions,
    CompletionProvider, CompletionResult, ModelRouting, ProviderRequest,
};
use crate::core::{retry_async_with, Config, RetryConfig, RetryDecision};

/// Client shared by every step handler.
pub struct CompletionClient {
    provider: Arc<dyn CompletionProvider>,
    routing: ModelRouting,
    retry: RetryConfig,
    min_interval: Duration,
    /// Start time of the previous provider call
    last_call: Mutex<Option<Instant>>,
    calls: AtomicU64,
}

impl CompletionClient {
    /// Create a client with default routing, retry and a 1s request interval.
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            routing: ModelRouting::default(),
            retry: RetryConfig::default(),
            min_interval: Duration::from_secs(1),
            last_call: Mutex::new(None),
            calls: AtomicU64::new(0),
        }
    }

    /// Build the production client (Claude provider) from configuration.
    pub fn from_config(config: &Config) -> CompletionResult<Self> {
        let completion = &config.completion;
        let provider =
            ClaudeProvider::from_env(&completion.api_key_env, completion.request_timeout())?
                .with_endpoint(&completion.base_url)
                .with_api_version(&completion.api_version);

        Ok(Self::new(Arc::new(provider))
            .with_routing(config.models.clone())
            .with_retry(config.retry.to_retry_config())
            .with_min_interval(completion.min_request_interval()))
    }

    /// Set model routing.
    pub fn with_routing(mut self, routing: ModelRouting) -> Self {
        self.routing = routing;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the minimum spacing between provider calls.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Model routing in use.
    pub fn routing(&self) -> &ModelRouting {
        &self.routing
    }

    /// Model a request with these options would go to.
    pub fn resolve_model(&self, options: &CompletionOptions) -> String {
        options.model.clone().unwrap_or_else(|| self.routing.model_for(options.agent).to_string())
    }

    /// Total provider calls made, including retries.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Generate text for `messages`.
    ///
    /// Transient failures are retried with exponential backoff; once the
    /// attempt cap is reached the last failure is wrapped in
    /// [`CompletionError::RetriesExhausted`]. Credential and request errors
    /// are returned immediately.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> CompletionResult<String> {
        let model = self.resolve_model(options);
        let request = ProviderRequest::build(model, messages, options)?;

        tracing::debug!(
            provider = self.provider.name(),
            agent = %options.agent,
            model = %request.model,
            max_tokens = request.max_tokens,
            "Sending completion request"
        );

        let outcome =
            retry_async_with(&self.retry, || self.attempt(&request), retry_policy).await;

        match outcome.result {
            Ok(text) => {
                tracing::debug!(
                    model = %request.model,
                    attempts = outcome.attempts,
                    chars = text.len(),
                    "Completion received"
                );
                Ok(text)
            }
            Err(e) if e.is_transient() => {
                tracing::error!(
                    model = %request.model,
                    attempts = outcome.attempts,
                    error = %e,
                    "Completion failed after retries"
                );
                Err(CompletionError::RetriesExhausted {
                    attempts: outcome.attempts,
                    last: Box::new(e),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn attempt(&self, request: &ProviderRequest) -> CompletionResult<String> {
        self.wait_for_slot().await;
        self.calls.fetch_add(1, Ordering::SeqCst);

        let reply = self.provider.send(request).await?;
        extract_text(&reply).ok_or(CompletionError::EmptyResponse)
    }

    /// Fixed-interval rate limiting measured from the previous call's start.
    async fn wait_for_slot(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::trace!(wait_ms = wait.as_millis() as u64, "Rate limit wait");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

fn retry_policy(error: &CompletionError) -> RetryDecision {
    match error {
        CompletionError::RateLimited { retry_after: Some(secs) } => {
            RetryDecision::RetryAfter(Duration::from_secs(*secs))
        }
        e if e.is_transient() => RetryDecision::Retry,
        _ => RetryDecision::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentKind;
    use crate::completion::{GENERATION_MODEL, REASONING_MODEL};
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use serde_json::{json, Value};
    use std::collections::VecDeque;

    /// Provider replaying scripted outcomes and recording requests.
    struct ScriptedProvider {
        outcomes: SyncMutex<VecDeque<CompletionResult<Value>>>,
        requests: SyncMutex<Vec<ProviderRequest>>,
    }

    impl ScriptedProvider {
        fn new(outcomes: Vec<CompletionResult<Value>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: SyncMutex::new(outcomes.into()),
                requests: SyncMutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn send(&self, request: &ProviderRequest) -> CompletionResult<Value> {
            self.requests.lock().push(request.clone());
            self.outcomes.lock().pop_front().unwrap_or(Ok(json!("default reply")))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn client(provider: Arc<ScriptedProvider>) -> CompletionClient {
        CompletionClient::new(provider)
            .with_retry(RetryConfig::quick(3))
            .with_min_interval(Duration::ZERO)
    }

    fn messages() -> Vec<ChatMessage> {
        vec![ChatMessage::system("sys"), ChatMessage::user("hi")]
    }

    #[tokio::test]
    async fn test_routes_by_agent_kind() {
        let provider = ScriptedProvider::new(vec![]);
        let client = client(provider.clone());

        client
            .complete(&messages(), &CompletionOptions::new(AgentKind::Reviewer, 10, 0.5))
            .await
            .unwrap();
        client
            .complete(&messages(), &CompletionOptions::new(AgentKind::ContentWriter, 10, 0.5))
            .await
            .unwrap();
        client
            .complete(
                &messages(),
                &CompletionOptions::new(AgentKind::Reviewer, 10, 0.5).with_model("override"),
            )
            .await
            .unwrap();

        let requests = provider.requests.lock();
        assert_eq!(requests[0].model, REASONING_MODEL);
        assert_eq!(requests[1].model, GENERATION_MODEL);
        assert_eq!(requests[2].model, "override");
        assert_eq!(requests[0].system.as_deref(), Some("sys"));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let provider = ScriptedProvider::new(vec![
            Err(CompletionError::Network("reset".into())),
            Err(CompletionError::Server { status: 503, message: "busy".into() }),
            Ok(json!({"content": [{"type": "text", "text": "third time"}]})),
        ]);
        let client = client(provider.clone());

        let text = client
            .complete(&messages(), &CompletionOptions::new(AgentKind::Brainstormer, 10, 0.8))
            .await
            .unwrap();

        assert_eq!(text, "third time");
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_names_last_failure() {
        let provider = ScriptedProvider::new(vec![
            Err(CompletionError::Timeout),
            Err(CompletionError::Timeout),
            Err(CompletionError::RateLimited { retry_after: None }),
        ]);
        let client = client(provider);

        let err = client
            .complete(&messages(), &CompletionOptions::new(AgentKind::Reviewer, 10, 0.5))
            .await
            .unwrap_err();

        match err {
            CompletionError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, CompletionError::RateLimited { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_auth_errors_are_not_retried() {
        let provider = ScriptedProvider::new(vec![Err(CompletionError::Unauthorized {
            status: 401,
            message: "bad key".into(),
        })]);
        let client = client(provider);

        let err = client
            .complete(&messages(), &CompletionOptions::new(AgentKind::Reviewer, 10, 0.5))
            .await
            .unwrap_err();

        assert!(err.is_auth());
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_reply_is_a_failure() {
        let provider = ScriptedProvider::new(vec![Ok(json!("")), Ok(json!({})), Ok(json!(" "))]);
        let client = client(provider);

        let err = client
            .complete(&messages(), &CompletionOptions::new(AgentKind::Reviewer, 10, 0.5))
            .await
            .unwrap_err();

        match err {
            CompletionError::RetriesExhausted { last, .. } => {
                assert!(matches!(*last, CompletionError::EmptyResponse));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_provider() {
        let provider = ScriptedProvider::new(vec![]);
        let client = client(provider.clone());

        let options = CompletionOptions::new(AgentKind::Reviewer, 1, 0.1);
        let err = client.complete(&[ChatMessage::system("only")], &options).await.unwrap_err();

        assert!(matches!(err, CompletionError::InvalidRequest(_)));
        assert!(provider.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_min_interval_spaces_calls() {
        let provider = ScriptedProvider::new(vec![]);
        let client = CompletionClient::new(provider)
            .with_retry(RetryConfig::no_retry())
            .with_min_interval(Duration::from_millis(40));
        let options = CompletionOptions::new(AgentKind::Reviewer, 1, 0.1);

        let start = Instant::now();
        client.complete(&messages(), &options).await.unwrap();
        client.complete(&messages(), &options).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
