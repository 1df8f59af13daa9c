use super::api::ApiClient;
use super::deck::FlashcardDeck;
use super::error::ClientError;
use super::session::{Action, StudySession};
use crate::output::{ExtractedContent, FlashcardSet, Summary};
use crate::pipeline::text::is_blank;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Drives [`ApiClient`] calls and records each outcome in a [`StudySession`].
///
/// Methods take `&self`, so unrelated actions can run concurrently (for
/// example an upload while a summary is pending); repeating an in-flight
/// action returns [`ClientError::ActionPending`] without sending anything.
pub struct StudyController {
    api: ApiClient,
    session: Mutex<StudySession>,
}

impl StudyController {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            session: Mutex::new(StudySession::new()),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> StudySession {
        self.with_session(|s| s.clone())
    }

    /// Study deck over the current flashcards, if any.
    pub fn deck(&self) -> Option<FlashcardDeck> {
        self.with_session(|s| s.flashcards().map(FlashcardDeck::new))
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut StudySession) -> R) -> R {
        let mut guard = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub async fn upload_pdf(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<ExtractedContent, ClientError> {
        self.with_session(|s| s.begin(Action::Upload))?;
        let result = self.api.upload_pdf(filename, bytes).await;
        self.finish_upload(result)
    }

    /// Blank text sets the banner and sends nothing.
    pub async fn upload_text(&self, text: &str) -> Result<ExtractedContent, ClientError> {
        if is_blank(text) {
            let err = ClientError::EmptyText;
            self.with_session(|s| s.set_error(err.banner()));
            return Err(err);
        }
        self.with_session(|s| s.begin(Action::Upload))?;
        let result = self.api.upload_text(text).await;
        self.finish_upload(result)
    }

    fn finish_upload(
        &self,
        result: Result<ExtractedContent, ClientError>,
    ) -> Result<ExtractedContent, ClientError> {
        match result {
            Ok(content) => {
                debug!("Upload ok: {} words", content.word_count);
                self.with_session(|s| s.upload_success(content.clone()));
                Ok(content)
            }
            Err(e) => {
                warn!("Upload failed: {}", e);
                self.with_session(|s| s.failure(Action::Upload, e.banner()));
                Err(e)
            }
        }
    }

    /// Start `action` on the loaded text.
    fn begin_on_content(&self, action: Action) -> Result<String, ClientError> {
        self.with_session(|s| {
            let text = match s.content() {
                Some(c) => c.text.clone(),
                None => {
                    let err = ClientError::NoContent;
                    s.set_error(err.banner());
                    return Err(err);
                }
            };
            s.begin(action)?;
            Ok(text)
        })
    }

    /// Summarise the loaded text.
    ///
    /// A result for text that was replaced while the request ran is
    /// returned but not stored.
    pub async fn summarize(&self) -> Result<Summary, ClientError> {
        let text = self.begin_on_content(Action::Summarize)?;
        match self.api.summarize(&text).await {
            Ok(summary) => {
                self.with_session(|s| {
                    if s.is_current(&text) {
                        s.summarize_success(summary.clone());
                    } else {
                        debug!("Discarding summary for replaced content");
                        s.discard(Action::Summarize);
                    }
                });
                Ok(summary)
            }
            Err(e) => {
                warn!("Summarize failed: {}", e);
                self.with_session(|s| s.failure(Action::Summarize, e.banner()));
                Err(e)
            }
        }
    }

    /// Generate `num_cards` flashcards from the loaded text.
    pub async fn generate_flashcards(&self, num_cards: usize) -> Result<FlashcardSet, ClientError> {
        let text = self.begin_on_content(Action::Flashcards)?;
        match self.api.flashcards(&text, num_cards).await {
            Ok(set) => {
                self.with_session(|s| {
                    if s.is_current(&text) {
                        s.flashcards_success(set.clone());
                    } else {
                        debug!("Discarding flashcards for replaced content");
                        s.discard(Action::Flashcards);
                    }
                });
                Ok(set)
            }
            Err(e) => {
                warn!("Flashcards failed: {}", e);
                self.with_session(|s| s.failure(Action::Flashcards, e.banner()));
                Err(e)
            }
        }
    }

    pub fn dismiss_error(&self) {
        self.with_session(|s| s.dismiss_error());
    }
}
