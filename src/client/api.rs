//! Typed HTTP client for the studycards service.

use super::error::{ClientError, DEFAULT_ERROR_MESSAGE};
use crate::output::{ExtractedContent, FlashcardSet, HealthStatus, Summary};
use crate::pipeline::text::is_blank;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Client for the service at `base_url` (e.g. `http://localhost:8000`).
    /// `timeout` of `None` keeps reqwest's default.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /`
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let resp = self.http.get(self.url("/")).send().await?;
        decode(resp).await
    }

    /// Upload PDF bytes as the `file` part.
    pub async fn upload_pdf(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<ExtractedContent, ClientError> {
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);
        debug!("POST /upload (file '{}')", filename);
        let resp = self
            .http
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?;
        decode(resp).await
    }

    /// Upload pasted text as the `text` part. Blank text is rejected here
    /// and never sent.
    pub async fn upload_text(&self, text: &str) -> Result<ExtractedContent, ClientError> {
        if is_blank(text) {
            return Err(ClientError::EmptyText);
        }
        let form = Form::new().text("text", text.to_string());
        debug!("POST /upload (text, {} chars)", text.len());
        let resp = self
            .http
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?;
        decode(resp).await
    }

    /// `POST /summarize`
    pub async fn summarize(&self, text: &str) -> Result<Summary, ClientError> {
        let resp = self
            .http
            .post(self.url("/summarize"))
            .json(&json!({ "text": text }))
            .send()
            .await?;
        decode(resp).await
    }

    /// `POST /flashcards?num_cards=N`
    pub async fn flashcards(&self, text: &str, num_cards: usize) -> Result<FlashcardSet, ClientError> {
        let resp = self
            .http
            .post(self.url("/flashcards"))
            .query(&[("num_cards", num_cards)])
            .json(&json!({ "text": text }))
            .send()
            .await?;
        let set: FlashcardSet = decode(resp).await?;
        if set.total_count != set.flashcards.len() {
            return Err(ClientError::InvalidResponse(format!(
                "total_count {} does not match {} flashcards",
                set.total_count,
                set.flashcards.len()
            )));
        }
        Ok(set)
    }
}

/// Parse a 2xx body as `T`, or turn a non-2xx response into [`ClientError::Api`].
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    let body = resp.bytes().await?;

    if status.is_success() {
        serde_json::from_slice(&body).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    } else {
        let detail = error_detail(&body).unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());
        Err(ClientError::Api {
            status: status.as_u16(),
            detail,
        })
    }
}

/// `detail` from an error body: a string, or the first `msg` of a
/// validation-error list.
fn error_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => items
            .iter()
            .find_map(|i| i.get("msg").and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}
