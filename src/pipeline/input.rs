//! Input resolution: load a user-supplied path or URL into memory.
//!
//! Both extraction backends read from a byte slice, so nothing touches the
//! file system after loading. The document kind is decided by the `%PDF`
//! signature, not by the file extension.

use crate::error::StudyError;
use crate::pipeline::extract::looks_like_pdf;
use std::path::Path;
use tracing::{debug, info};

/// What the loaded bytes are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

/// A document held in memory.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// File name (last path or URL segment).
    pub name: String,
    pub bytes: Vec<u8>,
    pub kind: DocumentKind,
}

impl LoadedDocument {
    fn new(name: String, bytes: Vec<u8>) -> Self {
        let kind = if looks_like_pdf(&bytes) {
            DocumentKind::Pdf
        } else {
            DocumentKind::Text
        };
        Self { name, bytes, kind }
    }

    /// The bytes as UTF-8 text.
    ///
    /// # Errors
    /// [`StudyError::InvalidInput`] if the document is a PDF or not UTF-8.
    pub fn into_text(self) -> Result<String, StudyError> {
        if self.kind == DocumentKind::Pdf {
            return Err(StudyError::InvalidInput { input: self.name });
        }
        String::from_utf8(self.bytes).map_err(|_| StudyError::InvalidInput { input: self.name })
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load `input` from a URL (with `timeout_secs`) or from the local disk.
pub async fn load_document(input: &str, timeout_secs: u64) -> Result<LoadedDocument, StudyError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        load_local(input).await
    }
}

async fn load_local(path_str: &str) -> Result<LoadedDocument, StudyError> {
    let path = Path::new(path_str);
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|_| StudyError::InvalidInput {
            input: path_str.to_string(),
        })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path_str.to_string());
    debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
    Ok(LoadedDocument::new(name, bytes))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<LoadedDocument, StudyError> {
    info!("Downloading from: {}", url);

    let failed = |reason: String| StudyError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {timeout_secs}s"))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| failed(e.to_string()))?
        .to_vec();

    info!("Downloaded {} bytes", bytes.len());
    Ok(LoadedDocument::new(filename_from_url(url), bytes))
}

/// Last non-empty path segment of `url`, or `download`.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }
    "download".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(filename_from_url("https://x.org/papers/cells.pdf"), "cells.pdf");
        assert_eq!(filename_from_url("https://x.org/"), "download");
        assert_eq!(filename_from_url("not a url"), "download");
    }

    #[tokio::test]
    async fn loads_text_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "Plain notes about cells.").unwrap();
        let doc = load_document(f.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(doc.kind, DocumentKind::Text);
        assert_eq!(doc.into_text().unwrap(), "Plain notes about cells.");
    }

    #[tokio::test]
    async fn detects_pdf_by_signature() {
        let mut f = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        f.write_all(b"%PDF-1.7\n%binary").unwrap();
        let doc = load_document(f.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(doc.kind, DocumentKind::Pdf);
        assert!(doc.into_text().is_err());
    }

    #[tokio::test]
    async fn missing_file_is_invalid_input() {
        let err = load_document("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, StudyError::InvalidInput { .. }));
    }
}
