//! Error types for the edgequake-studycards library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`StudyError`] — **Fatal**: the request cannot produce a result at all
//!   (not a PDF, no extractable text, model not configured, text too large).
//!   Returned as `Err(StudyError)` from [`crate::summarize::summarize`],
//!   [`crate::flashcards::generate_flashcards`] and the extractors.
//!
//! * [`ChunkError`] — **Non-fatal**: one chunk of a long document or one
//!   flashcard failed, but a deterministic fallback filled the gap. Stored in
//!   [`crate::output::SummaryStats`] / [`crate::output::FlashcardStats`] so
//!   callers can see how much of the result came from the model.

use thiserror::Error;

/// All fatal errors returned by the edgequake-studycards library.
#[derive(Debug, Error)]
pub enum StudyError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The request carried neither a file nor text.
    #[error("Either file or text must be provided")]
    MissingInput,

    /// An uploaded file was declared as something other than a PDF.
    #[error("Only PDF files are allowed")]
    UnsupportedFileType { content_type: String },

    /// The bytes do not start with the `%PDF` signature.
    #[error("File is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a readable file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Text is blank after extraction or submission.
    #[error("No text content found")]
    EmptyText,

    /// Text exceeds the configured word budget.
    #[error(
        "Text is too large. Maximum {max} words allowed, but received {words} words. \
Please upload a smaller document or reduce the text length."
    )]
    TextTooLarge { words: usize, max: usize },

    /// Requested card count is outside the accepted range.
    #[error("Number of cards must be between 1 and {max}")]
    InvalidCardCount { requested: usize, max: usize },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// Every extraction backend failed to read the document.
    #[error("Could not extract text from PDF: {detail}")]
    ExtractionFailed { detail: String },

    /// The document parsed but contains no extractable text (e.g. scans).
    #[error("No text found in PDF")]
    NoTextInPdf,

    // ── Model errors ──────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The model call failed after all retries.
    #[error("Model '{model}' failed after {attempts} attempt(s): {message}")]
    ModelFailed {
        model: String,
        attempts: u32,
        message: String,
    },

    /// The model answered with nothing usable.
    #[error("Model '{model}' returned an empty completion")]
    EmptyModelOutput { model: String },

    /// Every chunk of a long document failed and no fallback text remained.
    #[error("Failed to summarize any text chunks ({total} attempted)")]
    AllChunksFailed { total: usize },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StudyError {
    /// True when the error was caused by the caller's input rather than by a
    /// model or library failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StudyError::MissingInput
                | StudyError::UnsupportedFileType { .. }
                | StudyError::NotAPdf { .. }
                | StudyError::InvalidInput { .. }
                | StudyError::EmptyText
                | StudyError::TextTooLarge { .. }
                | StudyError::InvalidCardCount { .. }
                | StudyError::ExtractionFailed { .. }
                | StudyError::NoTextInPdf
        )
    }
}

/// A non-fatal error for a single chunk or card.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ChunkError {
    /// A chunk summary failed; the first sentences of the chunk were used.
    #[error("Chunk {chunk}: summary failed, used leading sentences: {detail}")]
    SummaryFailed { chunk: usize, detail: String },

    /// The condensing pass failed; the joined chunk summaries were truncated.
    #[error("Condensing pass failed, truncated combined summary: {detail}")]
    CondenseFailed { detail: String },

    /// A flashcard generation failed; a fill-in-the-blank card was used.
    #[error("Card {card}: generation failed, used fallback card: {detail}")]
    CardFailed { card: usize, detail: String },
}
