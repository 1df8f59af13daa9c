//! Progress-callback trait for per-chunk summarization events.
//!
//! Inject an [`Arc<dyn SummaryProgressCallback>`] via
//! [`crate::config::StudyConfigBuilder::progress_callback`] to receive events
//! as long documents are summarised chunk by chunk. The CLI uses it to drive
//! a terminal progress bar.
//!
//! # Example
//!
//! ```rust
//! use edgequake_studycards::{StudyConfig, SummaryProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl SummaryProgressCallback for CountingCallback {
//!     fn on_chunk_complete(&self, chunk: usize, total: usize, summary_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Chunk {}/{} done ({} chars)", chunk, total, summary_len);
//!     }
//! }
//!
//! let config = StudyConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the summarization pipeline as it processes each chunk.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// Chunks are summarised concurrently, so `on_chunk_complete` and
/// `on_chunk_error` may be called from different tasks at the same time.
/// Protect shared mutable state with `Mutex` or atomics.
pub trait SummaryProgressCallback: Send + Sync {
    /// Called once before the first model call.
    ///
    /// # Arguments
    /// * `total_chunks`: 1 for texts summarised in a single call
    fn on_summary_start(&self, total_chunks: usize) {
        let _ = total_chunks;
    }

    /// Called when a chunk summary comes back from the model.
    ///
    /// # Arguments
    /// * `chunk`       : 1-indexed chunk number
    /// * `total`       : total chunks
    /// * `summary_len` : characters in the chunk summary
    fn on_chunk_complete(&self, chunk: usize, total: usize, summary_len: usize) {
        let _ = (chunk, total, summary_len);
    }

    /// Called when a chunk falls back to its leading sentences.
    fn on_chunk_error(&self, chunk: usize, total: usize, error: &str) {
        let _ = (chunk, total, error);
    }

    /// Called once with the final summary length in words.
    fn on_summary_complete(&self, total_chunks: usize, summary_words: usize) {
        let _ = (total_chunks, summary_words);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SummaryProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::StudyConfig`].
pub type ProgressCallback = Arc<dyn SummaryProgressCallback>;
