//! # Response Generation
//!
//! The single suspension point of an agent iteration: a [`Prompt`] goes out,
//! one [`GeneratedResponse`] comes back.
//!
//! - [`ProviderGenerator`] adapts any [`LlmProvider`], retrying retryable
//!   failures with exponential backoff
//! - [`CachedGenerator`] puts a [`ResponseCache`] in front of another generator

use crate::cache::ResponseCache;
use crate::error::{Error, Result};
use crate::language::Prompt;
use crate::provider::{CompletionRequest, CompletionResponse, LlmProvider, UsageTracker};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What the model produced for one prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratedResponse {
    Text(TextResponse),
    ToolCall { name: String, arguments: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextResponse {
    pub content: String,
}

impl GeneratedResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(TextResponse {
            content: content.into(),
        })
    }

    pub fn tool_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self::ToolCall {
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Honors the first tool call when the model requested several
    pub fn from_completion(response: CompletionResponse) -> Self {
        match response.tool_calls.into_iter().next() {
            Some(call) => Self::ToolCall {
                name: call.name,
                arguments: call.arguments,
            },
            None => Self::text(response.content.unwrap_or_default()),
        }
    }

    /// The raw response text the agent parses and records.
    ///
    /// A tool call renders as `{"tool": name, "args": arguments}`. Empty
    /// arguments become `{}`; arguments that are not valid JSON are embedded
    /// as a string so parsing rejects them.
    pub fn into_raw(self) -> String {
        match self {
            Self::Text(text) => text.content,
            Self::ToolCall { name, arguments } => {
                let args = if arguments.trim().is_empty() {
                    Value::Object(Map::new())
                } else {
                    serde_json::from_str(&arguments).unwrap_or(Value::String(arguments))
                };
                json!({ "tool": name, "args": args }).to_string()
            }
        }
    }
}

/// Produces a response for a prompt
#[allow(async_fn_in_trait)]
pub trait ResponseGenerator: Send + Sync {
    /// Model identifier, used for cache keys and logs
    fn model(&self) -> &str;

    async fn generate(&self, prompt: &Prompt) -> Result<GeneratedResponse>;
}

impl<G: ResponseGenerator> ResponseGenerator for &G {
    fn model(&self) -> &str {
        (**self).model()
    }

    async fn generate(&self, prompt: &Prompt) -> Result<GeneratedResponse> {
        (**self).generate(prompt).await
    }
}

// ============================================================================
// Provider-backed generation
// ============================================================================

/// Model settings for each request
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Overrides the provider's default model
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: usize,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.1,
            max_tokens: 1024,
            max_retries: 2,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

impl GenerationOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay = self.base_delay_ms.saturating_mul(1u64 << (attempt - 1).min(16));
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

/// Generator over an [`LlmProvider`]
pub struct ProviderGenerator<P> {
    provider: P,
    options: GenerationOptions,
    usage: Mutex<UsageTracker>,
}

impl<P: LlmProvider> ProviderGenerator<P> {
    pub fn new(provider: P) -> Self {
        Self::with_options(provider, GenerationOptions::default())
    }

    pub fn with_options(provider: P, options: GenerationOptions) -> Self {
        Self {
            provider,
            options,
            usage: Mutex::new(UsageTracker::default()),
        }
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Token usage across every completion so far
    pub fn usage(&self) -> UsageTracker {
        self.usage.lock().map(|u| *u).unwrap_or_default()
    }

    fn build_request(&self, prompt: &Prompt) -> CompletionRequest {
        let mut request = CompletionRequest::new(prompt.messages.clone())
            .with_model(self.model())
            .with_temperature(self.options.temperature)
            .with_max_tokens(self.options.max_tokens);
        if !prompt.tools.is_empty() {
            request = request.with_tools(prompt.tools.clone());
        }
        request
    }
}

impl<P: LlmProvider> ResponseGenerator for ProviderGenerator<P> {
    fn model(&self) -> &str {
        self.options
            .model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    async fn generate(&self, prompt: &Prompt) -> Result<GeneratedResponse> {
        let mut attempt = 0;
        let response = loop {
            match self.provider.complete(self.build_request(prompt)).await {
                Ok(response) => break response,
                Err(e) => {
                    let err = Error::from(e)
                        .with_operation("generator::generate")
                        .with_context("provider", self.provider.name())
                        .with_context("model", self.model());
                    if !err.is_retryable() {
                        return Err(err);
                    }
                    if attempt >= self.options.max_retries {
                        return Err(err.persist().with_context("attempts", (attempt + 1).to_string()));
                    }
                    attempt += 1;
                    let delay = self.options.delay_for_attempt(attempt);
                    warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying generation");
                    tokio::time::sleep(delay).await;
                }
            }
        };

        if let Ok(mut usage) = self.usage.lock() {
            usage.track(&response.usage);
        }
        debug!(
            model = %response.model,
            finish_reason = ?response.finish_reason,
            tool_calls = response.tool_calls.len(),
            "completion received"
        );

        Ok(GeneratedResponse::from_completion(response))
    }
}

// ============================================================================
// Caching
// ============================================================================

/// Serves repeated prompts from a [`ResponseCache`]. Cache write failures are
/// logged and do not fail generation.
pub struct CachedGenerator<G> {
    inner: G,
    cache: ResponseCache,
}

impl<G: ResponseGenerator> CachedGenerator<G> {
    pub fn new(inner: G, cache: ResponseCache) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }
}

impl<G: ResponseGenerator> ResponseGenerator for CachedGenerator<G> {
    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn generate(&self, prompt: &Prompt) -> Result<GeneratedResponse> {
        let key = ResponseCache::key_for(self.model(), prompt)?;
        if let Some(response) = self.cache.get(&key) {
            info!(key = %key, "using cached response");
            return Ok(response);
        }

        let response = self.inner.generate(prompt).await?;
        if let Err(e) = self.cache.set(&key, self.model(), &response) {
            warn!(error = %e, "failed to cache response");
        }
        Ok(response)
    }
}

/// Either generator, chosen at runtime
pub enum MaybeCached<G> {
    Direct(G),
    Cached(CachedGenerator<G>),
}

impl<G: ResponseGenerator> ResponseGenerator for MaybeCached<G> {
    fn model(&self) -> &str {
        match self {
            Self::Direct(g) => g.model(),
            Self::Cached(g) => g.model(),
        }
    }

    async fn generate(&self, prompt: &Prompt) -> Result<GeneratedResponse> {
        match self {
            Self::Direct(g) => g.generate(prompt).await,
            Self::Cached(g) => g.generate(prompt).await,
        }
    }
}
