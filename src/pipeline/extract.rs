//! PDF text extraction with an ordered chain of backends.
//!
//! ## Why two backends?
//!
//! pdfium reads almost everything, including PDFs with broken xref tables,
//! but it is a C++ library loaded at runtime and may be missing on a given
//! host. `pdf-extract` is pure Rust, always available, and handles the
//! common text-only case. [`DocumentExtractor`] tries pdfium first and falls
//! back to `pdf-extract` when pdfium errors *or* returns only whitespace,
//! which is what happens with some Type3-font documents.
//!
//! ## Why spawn_blocking?
//!
//! Both backends are CPU-bound and synchronous; pdfium additionally keeps
//! thread-local state. [`extract_pdf_text`] moves the work onto Tokio's
//! blocking pool so request handlers never stall a worker thread.

use crate::error::StudyError;
use crate::pipeline::text::is_blank;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The four bytes every PDF file starts with.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// One way of turning PDF bytes into plain text.
///
/// Implementations are synchronous; callers run them on a blocking thread.
pub trait TextExtractor: Send + Sync {
    /// Short backend name used in logs and error details.
    fn name(&self) -> &'static str;

    /// Extract all text, pages concatenated in order.
    fn extract(&self, pdf: &[u8]) -> Result<String, StudyError>;
}

/// Returns true when `bytes` starts with the PDF signature.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

// ── pdfium backend ───────────────────────────────────────────────────────

/// Text extraction through the pdfium library.
///
/// The library is bound on each call: first from `library_path` (or the
/// `PDFIUM_LIB_PATH` environment variable), then from the working
/// directory, then from the system library path.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    library_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    pub fn new() -> Self {
        Self {
            library_path: std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from),
        }
    }

    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, StudyError> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| StudyError::ExtractionFailed {
            detail: format!("pdfium library unavailable: {e:?}"),
        })?;
        Ok(Pdfium::new(bindings))
    }
}

impl TextExtractor for PdfiumExtractor {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn extract(&self, pdf: &[u8]) -> Result<String, StudyError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| StudyError::ExtractionFailed {
                detail: format!("pdfium could not open document: {e:?}"),
            })?;

        let pages = document.pages();
        debug!("pdfium: {} pages", pages.len());

        let mut text = String::new();
        for (idx, page) in pages.iter().enumerate() {
            let page_text = page.text().map_err(|e| StudyError::ExtractionFailed {
                detail: format!("pdfium text layer failed on page {}: {e:?}", idx + 1),
            })?;
            text.push_str(&page_text.all());
            text.push('\n');
        }
        Ok(text)
    }
}

// ── pdf-extract backend ──────────────────────────────────────────────────

/// Pure-Rust text extraction through the `pdf-extract` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractExtractor;

impl TextExtractor for PdfExtractExtractor {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract(&self, pdf: &[u8]) -> Result<String, StudyError> {
        pdf_extract::extract_text_from_mem(pdf).map_err(|e| StudyError::ExtractionFailed {
            detail: format!("pdf-extract failed: {e}"),
        })
    }
}

// ── Chain ────────────────────────────────────────────────────────────────

/// Ordered list of extraction backends; the first non-blank result wins.
pub struct DocumentExtractor {
    backends: Vec<Box<dyn TextExtractor>>,
}

impl Default for DocumentExtractor {
    /// pdfium, then pdf-extract.
    fn default() -> Self {
        Self::with_backends(vec![
            Box::new(PdfiumExtractor::new()),
            Box::new(PdfExtractExtractor),
        ])
    }
}

impl DocumentExtractor {
    pub fn with_backends(backends: Vec<Box<dyn TextExtractor>>) -> Self {
        Self { backends }
    }

    /// Names of the configured backends, in trial order.
    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Validate the signature, then try each backend in order.
    ///
    /// # Errors
    /// - [`StudyError::NotAPdf`] if the bytes are not a PDF.
    /// - [`StudyError::NoTextInPdf`] if at least one backend opened the
    ///   document but none found any text.
    /// - [`StudyError::ExtractionFailed`] if every backend errored.
    pub fn extract(&self, pdf: &[u8]) -> Result<String, StudyError> {
        if !looks_like_pdf(pdf) {
            return Err(StudyError::NotAPdf {
                magic: pdf.iter().take(4).copied().collect(),
            });
        }

        let mut failures: Vec<String> = Vec::new();
        let mut opened = false;

        for backend in &self.backends {
            match backend.extract(pdf) {
                Ok(text) if !is_blank(&text) => {
                    info!(
                        "Extracted {} chars with {}",
                        text.chars().count(),
                        backend.name()
                    );
                    return Ok(text);
                }
                Ok(_) => {
                    opened = true;
                    warn!("{} returned no text, trying next backend", backend.name());
                }
                Err(e) => {
                    warn!("{} extraction failed: {}", backend.name(), e);
                    failures.push(format!("{}: {}", backend.name(), e));
                }
            }
        }

        if opened {
            Err(StudyError::NoTextInPdf)
        } else {
            Err(StudyError::ExtractionFailed {
                detail: if failures.is_empty() {
                    "no extraction backend configured".to_string()
                } else {
                    failures.join("; ")
                },
            })
        }
    }
}

/// Run [`DocumentExtractor::extract`] on Tokio's blocking pool.
pub async fn extract_pdf_text(
    extractor: Arc<DocumentExtractor>,
    pdf: Vec<u8>,
) -> Result<String, StudyError> {
    tokio::task::spawn_blocking(move || extractor.extract(&pdf))
        .await
        .map_err(|e| StudyError::Internal(format!("Extraction task panicked: {e}")))?
}
