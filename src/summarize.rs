//! Summarization: text → one paragraph plus word-count metadata.
//!
//! ## Flow
//!
//! ```text
//! text ─ normalise ─┬─ ≤ max_input_chars ─ one call ─────────────────────────┐
//!                   └─ chunk (overlapping word windows)                      │
//!                        ├─ summarise chunks concurrently, order preserved   │
//!                        │    failed chunk → its first three sentences       │
//!                        ├─ join                                             │
//!                        └─ > condense_threshold_words ─ condense call ──────┤
//!                                 failed → truncate to truncate_words        │
//!                                                                   Summary ◄┘
//! ```
//!
//! A single failed chunk never fails the request: it degrades to extracted
//! sentences and is recorded as a [`ChunkError`] in [`SummaryStats`].

use crate::config::StudyConfig;
use crate::error::{ChunkError, StudyError};
use crate::model::{ModelRequest, TextModel};
use crate::output::{Summary, SummaryOutput, SummaryStats};
use crate::pipeline::postprocess::clean_summary;
use crate::pipeline::text::{
    chunk_words_with_overlap, is_blank, leading_sentences, normalize_whitespace, take_chars,
    truncate_words, word_count,
};
use crate::prompts::{condense_prompt, summarize_prompt, SUMMARY_SYSTEM_PROMPT};
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Sentences kept from a chunk whose summary failed.
const FALLBACK_SENTENCES: usize = 3;

/// Summarise `text` with `model`.
///
/// # Errors
/// - [`StudyError::EmptyText`] if `text` is blank.
/// - The model's error when a short text's single call fails.
/// - [`StudyError::EmptyModelOutput`] when that call returns nothing usable.
/// - [`StudyError::AllChunksFailed`] if no chunk produced any text.
pub async fn summarize(
    text: &str,
    model: &dyn TextModel,
    config: &StudyConfig,
) -> Result<SummaryOutput, StudyError> {
    let start = Instant::now();
    if is_blank(text) {
        return Err(StudyError::EmptyText);
    }

    let normalized = normalize_whitespace(text);
    let original_words = word_count(&normalized);
    let mut stats = SummaryStats::default();

    let summary = if normalized.chars().count() <= config.max_input_chars {
        stats.chunks = 1;
        if let Some(cb) = &config.progress_callback {
            cb.on_summary_start(1);
        }
        summarize_short(&normalized, model, config, &mut stats).await?
    } else {
        summarize_long(&normalized, model, config, &mut stats).await?
    };

    // The summary never reports more words than it was given.
    let summary = if word_count(&summary) > original_words {
        debug!(
            "Summary longer than input ({} > {} words), truncating",
            word_count(&summary),
            original_words
        );
        truncate_words(&summary, original_words)
    } else {
        summary
    };

    stats.duration_ms = start.elapsed().as_millis() as u64;
    let summary = Summary::new(text, summary);

    if let Some(cb) = &config.progress_callback {
        cb.on_summary_complete(stats.chunks, summary.summary_length);
    }
    info!(
        "Summarised {} words into {} ({} chunks, {} failed, condensed: {}, {}ms)",
        summary.original_length,
        summary.summary_length,
        stats.chunks,
        stats.failed_chunks,
        stats.condensed,
        stats.duration_ms
    );

    Ok(SummaryOutput { summary, stats })
}

fn summary_request(config: &StudyConfig, prompt: String, max_tokens: usize) -> ModelRequest {
    ModelRequest {
        system: SUMMARY_SYSTEM_PROMPT,
        prompt,
        temperature: config.temperature,
        max_tokens,
    }
}

async fn summarize_short(
    text: &str,
    model: &dyn TextModel,
    config: &StudyConfig,
    stats: &mut SummaryStats,
) -> Result<String, StudyError> {
    let request = summary_request(config, summarize_prompt(text), config.summary_tokens);
    let generation = model.generate(&request).await?;
    stats.input_tokens += generation.input_tokens;
    stats.output_tokens += generation.output_tokens;

    let summary = clean_summary(&generation.text);
    if is_blank(&summary) {
        return Err(StudyError::EmptyModelOutput {
            model: model.name().to_string(),
        });
    }
    if let Some(cb) = &config.progress_callback {
        cb.on_chunk_complete(1, 1, summary.chars().count());
    }
    Ok(summary)
}

async fn summarize_long(
    text: &str,
    model: &dyn TextModel,
    config: &StudyConfig,
    stats: &mut SummaryStats,
) -> Result<String, StudyError> {
    let chunks = chunk_words_with_overlap(text, config.chunk_words, config.chunk_overlap);
    let total = chunks.len();
    stats.chunks = total;
    info!("Summarising {} words in {} chunks", word_count(text), total);
    if let Some(cb) = &config.progress_callback {
        cb.on_summary_start(total);
    }

    let results: Vec<(usize, String, Result<(String, u64, u64), StudyError>)> =
        stream::iter(chunks.into_iter().enumerate())
            .map(|(idx, chunk)| async move {
                let request =
                    summary_request(config, summarize_prompt(&chunk), config.chunk_summary_tokens);
                let result = model.generate(&request).await.and_then(|g| {
                    let cleaned = clean_summary(&g.text);
                    if is_blank(&cleaned) {
                        Err(StudyError::EmptyModelOutput {
                            model: model.name().to_string(),
                        })
                    } else {
                        debug!("Chunk {}/{}: {} chars", idx + 1, total, cleaned.chars().count());
                        Ok((cleaned, g.input_tokens, g.output_tokens))
                    }
                });
                (idx, chunk, result)
            })
            .buffered(config.concurrency.max(1))
            .collect()
            .await;

    let mut parts: Vec<String> = Vec::with_capacity(total);
    for (idx, chunk, result) in results {
        match result {
            Ok((summary, input_tokens, output_tokens)) => {
                stats.input_tokens += input_tokens;
                stats.output_tokens += output_tokens;
                if let Some(cb) = &config.progress_callback {
                    cb.on_chunk_complete(idx + 1, total, summary.chars().count());
                }
                parts.push(summary);
            }
            Err(e) => {
                warn!("Chunk {}/{}: {}; using leading sentences", idx + 1, total, e);
                let detail = e.to_string();
                if let Some(cb) = &config.progress_callback {
                    cb.on_chunk_error(idx + 1, total, &detail);
                }
                stats.failed_chunks += 1;
                stats.errors.push(ChunkError::SummaryFailed {
                    chunk: idx + 1,
                    detail,
                });
                parts.push(leading_sentences(&chunk, FALLBACK_SENTENCES));
            }
        }
    }

    parts.retain(|p| !is_blank(p));
    if parts.is_empty() {
        return Err(StudyError::AllChunksFailed { total });
    }

    let combined = parts.join(" ");
    if word_count(&combined) <= config.condense_threshold_words {
        return Ok(combined);
    }

    condense(&combined, model, config, stats).await
}

/// One more pass over joined chunk summaries that ran too long.
async fn condense(
    combined: &str,
    model: &dyn TextModel,
    config: &StudyConfig,
    stats: &mut SummaryStats,
) -> Result<String, StudyError> {
    debug!("Condensing {} words of chunk summaries", word_count(combined));
    let request = summary_request(
        config,
        condense_prompt(take_chars(combined, config.max_input_chars)),
        config.condense_tokens,
    );

    let outcome = match model.generate(&request).await {
        Ok(g) => {
            stats.input_tokens += g.input_tokens;
            stats.output_tokens += g.output_tokens;
            let cleaned = clean_summary(&g.text);
            if is_blank(&cleaned) {
                Err(StudyError::EmptyModelOutput {
                    model: model.name().to_string(),
                })
            } else {
                Ok(cleaned)
            }
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(summary) => {
            stats.condensed = true;
            Ok(summary)
        }
        Err(e) => {
            warn!("Condensing pass failed: {}; truncating", e);
            stats.errors.push(ChunkError::CondenseFailed {
                detail: e.to_string(),
            });
            Ok(truncate_words(combined, config.truncate_words))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Generation;
    use crate::progress::SummaryProgressCallback;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    type Reply = Box<dyn Fn(&ModelRequest) -> Result<String, StudyError> + Send + Sync>;

    struct Scripted {
        reply: Reply,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(
            reply: impl Fn(&ModelRequest) -> Result<String, StudyError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                reply: Box::new(reply),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextModel for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: &ModelRequest) -> Result<Generation, StudyError> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            (self.reply)(request).map(|text| Generation {
                text,
                input_tokens: 10,
                output_tokens: 5,
            })
        }
    }

    fn failure() -> StudyError {
        StudyError::ModelFailed {
            model: "scripted".into(),
            attempts: 1,
            message: "503".into(),
        }
    }

    fn small_chunks() -> StudyConfig {
        StudyConfig::builder()
            .max_input_chars(200)
            .chunk_words(40)
            .chunk_overlap(4)
            .build()
            .unwrap()
    }

    /// `n` words in sentences of ten words each.
    fn long_text(n: usize) -> String {
        (0..n)
            .map(|i| {
                if i % 10 == 9 {
                    format!("word{i}.")
                } else {
                    format!("word{i}")
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The first word of the text being summarised.
    fn first_word(request: &ModelRequest) -> String {
        request
            .prompt
            .rsplit("\n\n")
            .next()
            .and_then(|t| t.split_whitespace().next())
            .unwrap_or("")
            .trim_end_matches('.')
            .to_string()
    }

    #[tokio::test]
    async fn short_text_uses_one_call() {
        let model = Scripted::new(|_| Ok("Summary: Cells are the unit of life.".into()));
        let config = StudyConfig::default();
        let text = "Cells are the basic unit of life. All organisms are made of cells.";

        let out = summarize(text, &model, &config).await.unwrap();
        assert_eq!(model.calls(), 1);
        assert_eq!(out.summary.summary, "Cells are the unit of life.");
        assert_eq!(out.summary.original_length, 13);
        assert_eq!(out.summary.summary_length, 6);
        assert_eq!(out.stats.chunks, 1);
        assert_eq!(out.stats.input_tokens, 10);
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        let model = Scripted::new(|_| Ok("x".into()));
        let err = summarize("  \n ", &model, &StudyConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StudyError::EmptyText));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn short_text_failure_is_fatal() {
        let model = Scripted::new(|_| Err(failure()));
        let err = summarize("A short text.", &model, &StudyConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StudyError::ModelFailed { .. }));
    }

    #[tokio::test]
    async fn empty_completion_is_an_error() {
        let model = Scripted::new(|_| Ok("```\n\n```".into()));
        let err = summarize("A short text.", &model, &StudyConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StudyError::EmptyModelOutput { .. }));
    }

    #[tokio::test]
    async fn long_text_is_chunked_in_order() {
        let model = Scripted::new(|r| Ok(format!("Starts at {}.", first_word(r))));
        let config = small_chunks();

        let out = summarize(&long_text(100), &model, &config).await.unwrap();
        // 100 words, window 40, stride 36 → starts at 0, 36, 72
        assert_eq!(out.stats.chunks, 3);
        assert_eq!(model.calls(), 3);
        assert_eq!(
            out.summary.summary,
            "Starts at word0. Starts at word36. Starts at word72."
        );
        assert!(!out.stats.condensed);
        assert_eq!(out.stats.output_tokens, 15);
    }

    #[tokio::test]
    async fn chunked_summary_runs_on_spawned_task() {
        // Handlers need a Send future over borrowed text; spawn demands the same.
        let model: Arc<dyn TextModel> =
            Arc::new(Scripted::new(|r| Ok(format!("Starts at {}.", first_word(r)))));
        let config = small_chunks();
        let text = long_text(100);

        let handle =
            tokio::spawn(async move { summarize(&text, model.as_ref(), &config).await });
        let out = handle.await.unwrap().unwrap();
        assert!(out.stats.chunks > 1);
        assert_eq!(out.stats.failed_chunks, 0);
    }

    #[tokio::test]
    async fn failed_chunk_uses_leading_sentences() {
        let model = Scripted::new(|r| {
            if first_word(r) == "word36" {
                Err(failure())
            } else {
                Ok("Fine.".into())
            }
        });
        let out = summarize(&long_text(100), &model, &small_chunks())
            .await
            .unwrap();

        assert_eq!(out.stats.failed_chunks, 1);
        assert!(matches!(
            out.stats.errors[0],
            ChunkError::SummaryFailed { chunk: 2, .. }
        ));
        assert!(
            out.summary.summary.contains("word36 word37 word38 word39."),
            "got: {}",
            out.summary.summary
        );
    }

    #[tokio::test]
    async fn long_combination_is_condensed() {
        let model = Scripted::new(|r| {
            if r.prompt.starts_with("Provide a comprehensive summary") {
                Ok("Short final summary.".into())
            } else {
                Ok(long_text(30))
            }
        });
        let config = StudyConfig::builder()
            .max_input_chars(200)
            .chunk_words(40)
            .chunk_overlap(4)
            .condense_threshold_words(50)
            .build()
            .unwrap();

        let out = summarize(&long_text(100), &model, &config).await.unwrap();
        assert!(out.stats.condensed);
        assert_eq!(out.summary.summary, "Short final summary.");
        assert_eq!(model.calls(), 4);
        let prompts = model.prompts.lock().unwrap();
        let condense = prompts.last().unwrap();
        let points = condense.trim_start_matches(
            "Provide a comprehensive summary of the following key points: ",
        );
        assert!(points.chars().count() <= 200);
    }

    #[tokio::test]
    async fn failed_condense_truncates() {
        let model = Scripted::new(|r| {
            if r.prompt.starts_with("Provide a comprehensive summary") {
                Err(failure())
            } else {
                Ok(long_text(30))
            }
        });
        let config = StudyConfig::builder()
            .max_input_chars(200)
            .chunk_words(40)
            .chunk_overlap(4)
            .condense_threshold_words(50)
            .truncate_words(20)
            .build()
            .unwrap();

        let out = summarize(&long_text(100), &model, &config).await.unwrap();
        assert!(!out.stats.condensed);
        assert_eq!(out.summary.summary_length, 20);
        assert!(out.summary.summary.ends_with("..."));
        assert!(matches!(
            out.stats.errors.last(),
            Some(ChunkError::CondenseFailed { .. })
        ));
    }

    #[tokio::test]
    async fn summary_never_longer_than_input() {
        let model = Scripted::new(|_| Ok(long_text(50)));
        let out = summarize("Two words.", &model, &StudyConfig::default())
            .await
            .unwrap();
        assert!(out.summary.summary_length <= out.summary.original_length);
    }

    #[derive(Default)]
    struct Counting {
        total: AtomicUsize,
        ok: AtomicUsize,
        failed: AtomicUsize,
        done: AtomicUsize,
    }

    impl SummaryProgressCallback for Counting {
        fn on_summary_start(&self, total_chunks: usize) {
            self.total.store(total_chunks, Ordering::SeqCst);
        }
        fn on_chunk_complete(&self, _chunk: usize, _total: usize, _len: usize) {
            self.ok.fetch_add(1, Ordering::SeqCst);
        }
        fn on_chunk_error(&self, _chunk: usize, _total: usize, _error: &str) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
        fn on_summary_complete(&self, _total: usize, _words: usize) {
            self.done.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn progress_events_per_chunk() {
        let counter = Arc::new(Counting::default());
        let config = StudyConfig::builder()
            .max_input_chars(200)
            .chunk_words(40)
            .chunk_overlap(4)
            .progress_callback(counter.clone())
            .build()
            .unwrap();
        let model = Scripted::new(|r| {
            if first_word(r) == "word72" {
                Err(failure())
            } else {
                Ok("Ok.".into())
            }
        });

        summarize(&long_text(100), &model, &config).await.unwrap();
        assert_eq!(counter.total.load(Ordering::SeqCst), 3);
        assert_eq!(counter.ok.load(Ordering::SeqCst), 2);
        assert_eq!(counter.failed.load(Ordering::SeqCst), 1);
        assert_eq!(counter.done.load(Ordering::SeqCst), 1);
    }
}
