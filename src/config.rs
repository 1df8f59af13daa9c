//! Configuration types for summarization and flashcard generation.
//!
//! All pipeline behaviour is controlled through [`StudyConfig`], built via
//! its [`StudyConfigBuilder`] or read from `STUDYCARDS_*` environment
//! variables with [`StudyConfig::from_env`]. HTTP-only settings (bind
//! address, CORS, body limit) live in [`crate::server::ServerConfig`].

use crate::error::StudyError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Configuration for the summarization and flashcard pipelines.
///
/// # Example
/// ```rust
/// use edgequake_studycards::StudyConfig;
///
/// let config = StudyConfig::builder()
///     .model("gpt-4.1-nano")
///     .fallback_model("gpt-4.1-mini")
///     .max_words(8000)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_words, 8000);
/// ```
#[derive(Clone)]
pub struct StudyConfig {
    // ── Models ──────────────────────────────────────────────────────────
    /// Primary model identifier, e.g. "gpt-4.1-nano". If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Secondary model tried when the primary summarization call fails.
    /// Uses the same provider as the primary.
    pub fallback_model: Option<String>,

    /// Dedicated model for flashcards. When set, flashcard calls try it first
    /// and fall back to the summarization model.
    pub flashcard_model: Option<String>,

    /// Sampling temperature for summaries. Default: 0.1.
    pub temperature: f32,

    /// Sampling temperature for flashcard questions. Default: 0.8.
    pub question_temperature: f32,

    /// Sampling temperature for condensed flashcard answers. Default: 0.3.
    pub answer_temperature: f32,

    /// Retries per model call on failure. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Concurrent model calls within one request. Default: 4.
    pub concurrency: usize,

    // ── Input limits ────────────────────────────────────────────────────
    /// Uploads with more words are rejected. Default: 5000.
    pub max_words: usize,

    /// Largest accepted `num_cards`. Default: 10.
    pub max_cards: usize,

    // ── Summarization ───────────────────────────────────────────────────
    /// Texts up to this many characters are summarised in one call;
    /// also the prefix length fed to the condensing pass. Default: 2048.
    pub max_input_chars: usize,

    /// Words per chunk for long texts. Default: 2048.
    pub chunk_words: usize,

    /// Words shared by consecutive chunks. Default: 100.
    pub chunk_overlap: usize,

    /// Joined chunk summaries longer than this are condensed. Default: 300.
    pub condense_threshold_words: usize,

    /// Word cap applied when the condensing pass fails. Default: 200.
    pub truncate_words: usize,

    /// Token budget for a single-call summary. Default: 150.
    pub summary_tokens: usize,

    /// Token budget per chunk summary. Default: 120.
    pub chunk_summary_tokens: usize,

    /// Token budget for the condensing pass. Default: 200.
    pub condense_tokens: usize,

    // ── Flashcards ──────────────────────────────────────────────────────
    /// Character budget of a content piece when the text has fewer
    /// sentences than requested cards. Default: 200.
    pub piece_chars: usize,

    /// Answers longer than this are condensed by the model. Default: 150.
    pub long_answer_chars: usize,

    /// Token budget for a question. Default: 50.
    pub question_tokens: usize,

    /// Token budget for a condensed answer. Default: 30.
    pub answer_tokens: usize,

    /// Optional per-chunk progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            fallback_model: None,
            flashcard_model: None,
            temperature: 0.1,
            question_temperature: 0.8,
            answer_temperature: 0.3,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            concurrency: 4,
            max_words: 5000,
            max_cards: 10,
            max_input_chars: 2048,
            chunk_words: 2048,
            chunk_overlap: 100,
            condense_threshold_words: 300,
            truncate_words: 200,
            summary_tokens: 150,
            chunk_summary_tokens: 120,
            condense_tokens: 200,
            piece_chars: 200,
            long_answer_chars: 150,
            question_tokens: 50,
            answer_tokens: 30,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for StudyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudyConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("fallback_model", &self.fallback_model)
            .field("flashcard_model", &self.flashcard_model)
            .field("temperature", &self.temperature)
            .field("max_retries", &self.max_retries)
            .field("concurrency", &self.concurrency)
            .field("max_words", &self.max_words)
            .field("max_cards", &self.max_cards)
            .field("max_input_chars", &self.max_input_chars)
            .field("chunk_words", &self.chunk_words)
            .field("chunk_overlap", &self.chunk_overlap)
            .finish()
    }
}

impl StudyConfig {
    /// Create a new builder for `StudyConfig`.
    pub fn builder() -> StudyConfigBuilder {
        StudyConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read `STUDYCARDS_*` variables on top of the defaults.
    ///
    /// Unset variables keep their default; set-but-unparsable ones are an
    /// error rather than being silently ignored.
    pub fn from_env() -> Result<Self, StudyError> {
        let mut b = Self::builder();

        if let Some(v) = env_string("STUDYCARDS_MODEL") {
            b = b.model(v);
        }
        if let Some(v) = env_string("STUDYCARDS_PROVIDER") {
            b = b.provider_name(v);
        }
        if let Some(v) = env_string("STUDYCARDS_FALLBACK_MODEL") {
            b = b.fallback_model(v);
        }
        if let Some(v) = env_string("STUDYCARDS_FLASHCARD_MODEL") {
            b = b.flashcard_model(v);
        }
        if let Some(v) = env_parse("STUDYCARDS_TEMPERATURE")? {
            b = b.temperature(v);
        }
        if let Some(v) = env_parse("STUDYCARDS_MAX_RETRIES")? {
            b = b.max_retries(v);
        }
        if let Some(v) = env_parse("STUDYCARDS_API_TIMEOUT")? {
            b = b.api_timeout_secs(v);
        }
        if let Some(v) = env_parse("STUDYCARDS_CONCURRENCY")? {
            b = b.concurrency(v);
        }
        if let Some(v) = env_parse("STUDYCARDS_MAX_WORDS")? {
            b = b.max_words(v);
        }
        if let Some(v) = env_parse("STUDYCARDS_MAX_CARDS")? {
            b = b.max_cards(v);
        }
        if let Some(v) = env_parse("STUDYCARDS_CHUNK_WORDS")? {
            b = b.chunk_words(v);
        }
        if let Some(v) = env_parse("STUDYCARDS_CHUNK_OVERLAP")? {
            b = b.chunk_overlap(v);
        }

        b.build()
    }
}

pub(crate) fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, StudyError> {
    match env_string(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            StudyError::InvalidConfig(format!("{key}={raw:?} is not a valid value"))
        }),
    }
}

/// Builder for [`StudyConfig`].
#[derive(Debug)]
pub struct StudyConfigBuilder {
    config: StudyConfig,
}

impl StudyConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn fallback_model(mut self, model: impl Into<String>) -> Self {
        self.config.fallback_model = Some(model.into());
        self
    }

    pub fn flashcard_model(mut self, model: impl Into<String>) -> Self {
        self.config.flashcard_model = Some(model.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn question_temperature(mut self, t: f32) -> Self {
        self.config.question_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_words(mut self, n: usize) -> Self {
        self.config.max_words = n;
        self
    }

    pub fn max_cards(mut self, n: usize) -> Self {
        self.config.max_cards = n;
        self
    }

    pub fn max_input_chars(mut self, n: usize) -> Self {
        self.config.max_input_chars = n;
        self
    }

    pub fn chunk_words(mut self, n: usize) -> Self {
        self.config.chunk_words = n;
        self
    }

    pub fn chunk_overlap(mut self, n: usize) -> Self {
        self.config.chunk_overlap = n;
        self
    }

    pub fn condense_threshold_words(mut self, n: usize) -> Self {
        self.config.condense_threshold_words = n;
        self
    }

    pub fn truncate_words(mut self, n: usize) -> Self {
        self.config.truncate_words = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StudyConfig, StudyError> {
        let c = &self.config;
        if c.max_words == 0 {
            return Err(StudyError::InvalidConfig("max_words must be ≥ 1".into()));
        }
        if c.max_cards == 0 {
            return Err(StudyError::InvalidConfig("max_cards must be ≥ 1".into()));
        }
        if c.chunk_words == 0 {
            return Err(StudyError::InvalidConfig("chunk_words must be ≥ 1".into()));
        }
        if c.chunk_overlap >= c.chunk_words {
            return Err(StudyError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_words ({})",
                c.chunk_overlap, c.chunk_words
            )));
        }
        if c.max_input_chars == 0 {
            return Err(StudyError::InvalidConfig(
                "max_input_chars must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_contract() {
        let c = StudyConfig::default();
        assert_eq!(c.max_words, 5000);
        assert_eq!(c.max_cards, 10);
        assert_eq!(c.max_input_chars, 2048);
        assert_eq!(c.chunk_overlap, 100);
    }

    #[test]
    fn builder_clamps_and_validates() {
        let c = StudyConfig::builder()
            .temperature(5.0)
            .concurrency(0)
            .build()
            .unwrap();
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.concurrency, 1);

        let err = StudyConfig::builder()
            .chunk_words(100)
            .chunk_overlap(100)
            .build()
            .unwrap_err();
        assert!(matches!(err, StudyError::InvalidConfig(_)));

        assert!(StudyConfig::builder().max_cards(0).build().is_err());
    }

    #[test]
    fn debug_hides_provider() {
        let s = format!("{:?}", StudyConfig::default());
        assert!(s.contains("StudyConfig"));
        assert!(!s.contains("progress_callback"));
    }

    #[test]
    fn env_parse_rejects_garbage() {
        std::env::set_var("STUDYCARDS_TEST_PARSE_GARBAGE", "many");
        let r: Result<Option<usize>, _> = env_parse("STUDYCARDS_TEST_PARSE_GARBAGE");
        assert!(r.is_err());
        std::env::set_var("STUDYCARDS_TEST_PARSE_OK", " 12 ");
        let r: Option<usize> = env_parse("STUDYCARDS_TEST_PARSE_OK").unwrap();
        assert_eq!(r, Some(12));
        let r: Option<usize> = env_parse("STUDYCARDS_TEST_PARSE_UNSET").unwrap();
        assert_eq!(r, None);
    }
}
