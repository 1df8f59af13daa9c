//! # edgequake-studycards
//!
//! Turn PDFs and pasted notes into summaries and flashcards with LLMs.
//!
//! The crate provides the library pipeline, an HTTP service exposing it, and
//! a typed client with the session state a study UI renders.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / text
//!  │
//!  ├─ 1. Input      local file, URL, or multipart upload
//!  ├─ 2. Extract    pdfium → pdf-extract fallback (spawn_blocking)
//!  ├─ 3. Validate   blank text and word budget (default 5000 words)
//!  ├─ 4a. Summarize one call, or overlapping chunks + condensing pass
//!  ├─ 4b. Cards     rotating question prompts, fallback cards, padding
//!  └─ 5. Polish     strip labels, fences and quotes from model output
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_studycards::{build_models, summarize, generate_flashcards, StudyConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = StudyConfig::default();
//!     let models = build_models(&config)?;
//!
//!     let text = std::fs::read_to_string("notes.txt")?;
//!     let summary = summarize(&text, models.summarizer.as_ref(), &config).await?;
//!     println!("{}", summary.summary.summary);
//!
//!     let cards = generate_flashcards(&text, 5, models.flashcards.as_ref(), &config).await?;
//!     for card in cards.set.flashcards {
//!         println!("Q: {}\nA: {}\n", card.question, card.answer);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `studycards` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-studycards = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod flashcards;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod server;
pub mod summarize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{ApiClient, ClientError, FlashcardDeck, StudyController, StudySession};
pub use config::{StudyConfig, StudyConfigBuilder};
pub use error::{ChunkError, StudyError};
pub use flashcards::generate_flashcards;
pub use model::{build_models, FallbackModel, LlmTextModel, ModelSet, TextModel};
pub use output::{
    ExtractedContent, Flashcard, FlashcardOutput, FlashcardSet, FlashcardStats, HealthStatus,
    Summary, SummaryOutput, SummaryStats,
};
pub use pipeline::extract::DocumentExtractor;
pub use progress::{NoopProgressCallback, ProgressCallback, SummaryProgressCallback};
pub use server::{AppState, ServerConfig};
pub use summarize::summarize;
