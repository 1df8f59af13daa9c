//! Text-side pipeline stages shared by the service, the library API and the CLI.
//!
//! Each submodule implements exactly one step, so each can be tested alone
//! and swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ text ──▶ (model) ──▶ postprocess
//! (path/URL) (pdfium,   (counts,             (cleanup)
//!            pdf-extract) chunks)
//! ```
//!
//! 1. [`input`]   — load a local file or download a URL into memory
//! 2. [`extract`] — PDF bytes to plain text; runs in `spawn_blocking`
//! 3. [`text`]    — normalisation, word counts, chunking, sentence splitting
//! 4. [`postprocess`] — deterministic cleanup of model output

pub mod extract;
pub mod input;
pub mod postprocess;
pub mod text;
