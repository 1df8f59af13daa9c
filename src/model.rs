//! Text-generation models: the seam between the pipelines and the LLM.
//!
//! Summarization and flashcard code only see [`TextModel`]. The production
//! implementation, [`LlmTextModel`], wraps an `edgequake_llm` provider with
//! timeouts and retries; [`FallbackModel`] chains a primary and a secondary
//! model. Tests substitute scripted fakes.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient and frequent under
//! concurrent load. Exponential backoff (`retry_backoff_ms * 2^(attempt-1)`)
//! spaces retries out: with 500 ms base and 2 retries the waits are
//! 500 ms then 1 s.

use crate::config::StudyConfig;
use crate::error::StudyError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Default model when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// One generation request.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: &'static str,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// A completed generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Anything that turns a prompt into text.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Model label used in logs and errors.
    fn name(&self) -> &str;

    /// Generate a completion. Implementations never return blank text as
    /// success; they return [`StudyError::EmptyModelOutput`] instead.
    async fn generate(&self, request: &ModelRequest) -> Result<Generation, StudyError>;
}

// ── LLM-backed model ─────────────────────────────────────────────────────

/// [`TextModel`] over an `edgequake_llm` provider, with retry and timeout.
pub struct LlmTextModel {
    provider: Arc<dyn LLMProvider>,
    label: String,
    max_retries: u32,
    retry_backoff_ms: u64,
    call_timeout: Duration,
}

impl LlmTextModel {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
            max_retries: 2,
            retry_backoff_ms: 500,
            call_timeout: Duration::from_secs(60),
        }
    }

    /// Copy retry and timeout settings from `config`.
    pub fn with_config(mut self, config: &StudyConfig) -> Self {
        self.max_retries = config.max_retries;
        self.retry_backoff_ms = config.retry_backoff_ms;
        self.call_timeout = Duration::from_secs(config.api_timeout_secs.max(1));
        self
    }
}

#[async_trait]
impl TextModel for LlmTextModel {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(&self, request: &ModelRequest) -> Result<Generation, StudyError> {
        let messages = vec![
            ChatMessage::system(request.system),
            ChatMessage::user(&request.prompt),
        ];
        let options = build_options(request);

        let mut last_err: Option<String> = None;
        let mut saw_empty = false;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_delay(self.retry_backoff_ms, attempt);
                warn!(
                    "{}: retry {}/{} after {}ms",
                    self.label, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(self.call_timeout, self.provider.chat(&messages, Some(&options))).await {
                Ok(Ok(response)) if !response.content.trim().is_empty() => {
                    debug!(
                        "{}: {} input tokens, {} output tokens",
                        self.label, response.prompt_tokens, response.completion_tokens
                    );
                    return Ok(Generation {
                        text: response.content,
                        input_tokens: response.prompt_tokens as u64,
                        output_tokens: response.completion_tokens as u64,
                    });
                }
                Ok(Ok(_)) => {
                    warn!("{}: attempt {} returned empty content", self.label, attempt + 1);
                    saw_empty = true;
                    last_err = None;
                }
                Ok(Err(e)) => {
                    let err_msg = format!("{}", e);
                    warn!("{}: attempt {} failed: {}", self.label, attempt + 1, err_msg);
                    last_err = Some(err_msg);
                }
                Err(_) => {
                    let err_msg = format!("timed out after {}s", self.call_timeout.as_secs());
                    warn!("{}: attempt {} {}", self.label, attempt + 1, err_msg);
                    last_err = Some(err_msg);
                }
            }
        }

        match last_err {
            Some(message) => Err(StudyError::ModelFailed {
                model: self.label.clone(),
                attempts: self.max_retries + 1,
                message,
            }),
            None if saw_empty => Err(StudyError::EmptyModelOutput {
                model: self.label.clone(),
            }),
            None => Err(StudyError::Internal(format!(
                "{}: no attempt was made",
                self.label
            ))),
        }
    }
}

/// Wait before retry `attempt` (1-based).
fn backoff_delay(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Build `CompletionOptions` from a request.
fn build_options(request: &ModelRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_tokens),
        ..Default::default()
    }
}

// ── Fallback chain ───────────────────────────────────────────────────────

/// Tries `primary`, then `secondary` when the primary fails.
pub struct FallbackModel {
    primary: Arc<dyn TextModel>,
    secondary: Arc<dyn TextModel>,
}

impl FallbackModel {
    pub fn new(primary: Arc<dyn TextModel>, secondary: Arc<dyn TextModel>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl TextModel for FallbackModel {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn generate(&self, request: &ModelRequest) -> Result<Generation, StudyError> {
        match self.primary.generate(request).await {
            Ok(g) => Ok(g),
            Err(e) => {
                warn!(
                    "{} failed ({}), falling back to {}",
                    self.primary.name(),
                    e,
                    self.secondary.name()
                );
                self.secondary.generate(request).await
            }
        }
    }
}

// ── Model resolution ─────────────────────────────────────────────────────

/// The two models the service uses.
#[derive(Clone)]
pub struct ModelSet {
    /// Model for summaries (with optional fallback model).
    pub summarizer: Arc<dyn TextModel>,
    /// Model for flashcards; the summarizer unless a dedicated one is set.
    pub flashcards: Arc<dyn TextModel>,
}

impl ModelSet {
    /// Use the same model for everything.
    pub fn single(model: Arc<dyn TextModel>) -> Self {
        Self {
            summarizer: Arc::clone(&model),
            flashcards: model,
        }
    }
}

/// Resolve providers from `config` and the environment, and wire the
/// fallback chains.
///
/// - summarizer: primary, then `fallback_model` if set
/// - flashcards: `flashcard_model` if set, then the summarizer
pub fn build_models(config: &StudyConfig) -> Result<ModelSet, StudyError> {
    let primary_label = config
        .model
        .clone()
        .unwrap_or_else(|| "auto".to_string());
    let primary: Arc<dyn TextModel> = Arc::new(
        LlmTextModel::new(resolve_provider(config)?, primary_label).with_config(config),
    );

    let summarizer: Arc<dyn TextModel> = match &config.fallback_model {
        Some(name) => {
            let secondary = named_model(config, name)?;
            info!("Summaries: {} with fallback {}", primary.name(), name);
            Arc::new(FallbackModel::new(primary, secondary))
        }
        None => primary,
    };

    let flashcards: Arc<dyn TextModel> = match &config.flashcard_model {
        Some(name) => {
            info!("Flashcards: {} with fallback {}", name, summarizer.name());
            Arc::new(FallbackModel::new(
                named_model(config, name)?,
                Arc::clone(&summarizer),
            ))
        }
        None => Arc::clone(&summarizer),
    };

    Ok(ModelSet {
        summarizer,
        flashcards,
    })
}

/// A secondary model on the same provider family as the primary.
fn named_model(config: &StudyConfig, model: &str) -> Result<Arc<dyn TextModel>, StudyError> {
    let provider_name = config
        .provider_name
        .clone()
        .or_else(|| std::env::var("EDGEQUAKE_LLM_PROVIDER").ok().filter(|p| !p.is_empty()))
        .unwrap_or_else(|| "openai".to_string());
    let provider = create_provider(&provider_name, model)?;
    Ok(Arc::new(LlmTextModel::new(provider, model).with_config(config)))
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, StudyError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        StudyError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **OpenAI** when `OPENAI_API_KEY` is set.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &StudyConfig) -> Result<Arc<dyn LLMProvider>, StudyError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| StudyError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        label: &'static str,
        reply: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(label: &'static str, reply: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                label,
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TextModel for Scripted {
        fn name(&self) -> &str {
            self.label
        }

        async fn generate(&self, _request: &ModelRequest) -> Result<Generation, StudyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Some(text) => Ok(Generation {
                    text: text.to_string(),
                    input_tokens: 3,
                    output_tokens: 2,
                }),
                None => Err(StudyError::ModelFailed {
                    model: self.label.to_string(),
                    attempts: 1,
                    message: "unavailable".into(),
                }),
            }
        }
    }

    fn request() -> ModelRequest {
        ModelRequest {
            system: "sys",
            prompt: "Summarize the following text:\n\nhello".into(),
            temperature: 0.2,
            max_tokens: 150,
        }
    }

    #[test]
    fn build_options_copies_request() {
        let opts = build_options(&request());
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(150));
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff_delay(500, 1), 500);
        assert_eq!(backoff_delay(500, 2), 1000);
        assert_eq!(backoff_delay(500, 3), 2000);
        assert_eq!(backoff_delay(u64::MAX, 40), u64::MAX);
    }

    #[tokio::test]
    async fn fallback_not_used_when_primary_succeeds() {
        let primary = Scripted::new("primary", Some("first"));
        let secondary = Scripted::new("secondary", Some("second"));
        let model = FallbackModel::new(primary.clone(), secondary.clone());

        let g = model.generate(&request()).await.unwrap();
        assert_eq!(g.text, "first");
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
        assert_eq!(model.name(), "primary");
    }

    #[tokio::test]
    async fn fallback_used_when_primary_fails() {
        let primary = Scripted::new("primary", None);
        let secondary = Scripted::new("secondary", Some("second"));
        let model = FallbackModel::new(primary.clone(), secondary.clone());

        let g = model.generate(&request()).await.unwrap();
        assert_eq!(g.text, "second");
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn both_failing_returns_secondary_error() {
        let model = FallbackModel::new(Scripted::new("p", None), Scripted::new("s", None));
        match model.generate(&request()).await {
            Err(StudyError::ModelFailed { model, .. }) => assert_eq!(model, "s"),
            other => panic!("expected ModelFailed, got {other:?}"),
        }
    }

    #[test]
    fn model_set_single_shares_model() {
        let m: Arc<dyn TextModel> = Scripted::new("only", Some("x"));
        let set = ModelSet::single(m);
        assert_eq!(set.summarizer.name(), "only");
        assert_eq!(set.flashcards.name(), "only");
    }
}
