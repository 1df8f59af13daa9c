use super::session::Action;
use thiserror::Error;

/// Banner text when the server gives no `detail`.
pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred. Please try again.";

/// Errors surfaced by [`super::ApiClient`] and [`super::StudyController`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced an HTTP response.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response; `detail` is the server's message or the default.
    #[error("{detail}")]
    Api { status: u16, detail: String },

    /// A 2xx response whose body did not match the expected shape.
    #[error("Unexpected response from server: {0}")]
    InvalidResponse(String),

    /// Blank text was submitted; no request was sent.
    #[error("Please enter some text")]
    EmptyText,

    /// Summarize or flashcards was requested before any upload.
    #[error("Upload a PDF or paste text first")]
    NoContent,

    /// The same action is already in flight.
    #[error("{0} is already in progress")]
    ActionPending(Action),
}

impl ClientError {
    /// Text for the error banner.
    pub fn banner(&self) -> String {
        match self {
            ClientError::Api { detail, .. } => detail.clone(),
            ClientError::Transport(_) => DEFAULT_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}
