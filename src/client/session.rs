//! Client-side state: one store, explicit transitions.
//!
//! ```text
//! Empty ── upload ok ──► ContentLoaded ──┬─ summarize ok ──► + summary
//!                          ▲             └─ flashcards ok ─► + flashcards
//!                          └── upload ok (clears summary and flashcards)
//! ```
//!
//! Failures set the error banner and change nothing else. Each action has
//! its own pending flag; unrelated actions may overlap.

use super::error::ClientError;
use crate::output::{ExtractedContent, FlashcardSet, Summary};
use std::fmt;

/// A user action that issues one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Upload,
    Summarize,
    Flashcards,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Upload => "upload",
            Action::Summarize => "summarize",
            Action::Flashcards => "flashcards",
        })
    }
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    ContentLoaded,
}

#[derive(Debug, Clone, Default)]
pub struct StudySession {
    content: Option<ExtractedContent>,
    summary: Option<Summary>,
    flashcards: Option<FlashcardSet>,
    error: Option<String>,
    upload_pending: bool,
    summarize_pending: bool,
    flashcards_pending: bool,
}

impl StudySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        if self.content.is_some() {
            Phase::ContentLoaded
        } else {
            Phase::Empty
        }
    }

    pub fn content(&self) -> Option<&ExtractedContent> {
        self.content.as_ref()
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    pub fn flashcards(&self) -> Option<&FlashcardSet> {
        self.flashcards.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_summarized(&self) -> bool {
        self.summary.is_some()
    }

    pub fn is_flashcarded(&self) -> bool {
        self.flashcards.is_some()
    }

    pub fn is_pending(&self, action: Action) -> bool {
        *self.pending_flag(action)
    }

    fn pending_flag(&self, action: Action) -> &bool {
        match action {
            Action::Upload => &self.upload_pending,
            Action::Summarize => &self.summarize_pending,
            Action::Flashcards => &self.flashcards_pending,
        }
    }

    fn pending_flag_mut(&mut self, action: Action) -> &mut bool {
        match action {
            Action::Upload => &mut self.upload_pending,
            Action::Summarize => &mut self.summarize_pending,
            Action::Flashcards => &mut self.flashcards_pending,
        }
    }

    /// Mark `action` as in flight and clear the banner.
    ///
    /// # Errors
    /// [`ClientError::ActionPending`] if `action` is already in flight.
    pub fn begin(&mut self, action: Action) -> Result<(), ClientError> {
        let flag = self.pending_flag_mut(action);
        if *flag {
            return Err(ClientError::ActionPending(action));
        }
        *flag = true;
        self.error = None;
        Ok(())
    }

    /// New content replaces the old and invalidates derived results.
    pub fn upload_success(&mut self, content: ExtractedContent) {
        self.upload_pending = false;
        self.content = Some(content);
        self.summary = None;
        self.flashcards = None;
    }

    pub fn summarize_success(&mut self, summary: Summary) {
        self.summarize_pending = false;
        self.summary = Some(summary);
    }

    pub fn flashcards_success(&mut self, flashcards: FlashcardSet) {
        self.flashcards_pending = false;
        self.flashcards = Some(flashcards);
    }

    /// Record a failed `action`: show `message`, keep everything else.
    pub fn failure(&mut self, action: Action, message: impl Into<String>) {
        *self.pending_flag_mut(action) = false;
        self.error = Some(message.into());
    }

    /// End `action` without applying its result (the content it was
    /// derived from has since been replaced).
    pub fn discard(&mut self, action: Action) {
        *self.pending_flag_mut(action) = false;
    }

    /// True when `text` is still the loaded content.
    pub fn is_current(&self, text: &str) -> bool {
        self.content.as_ref().is_some_and(|c| c.text == text)
    }

    /// Show an error that was not caused by an in-flight request.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Flashcard;

    fn loaded(text: &str) -> StudySession {
        let mut s = StudySession::new();
        s.begin(Action::Upload).unwrap();
        s.upload_success(ExtractedContent::new(text));
        s
    }

    #[test]
    fn starts_empty() {
        let s = StudySession::new();
        assert_eq!(s.phase(), Phase::Empty);
        assert!(!s.is_summarized());
        assert!(s.error().is_none());
    }

    #[test]
    fn new_upload_clears_derived_results() {
        let mut s = loaded("text A");
        s.begin(Action::Summarize).unwrap();
        s.summarize_success(Summary::new("text A", "A"));
        s.begin(Action::Flashcards).unwrap();
        s.flashcards_success(FlashcardSet::new(vec![Flashcard::new("Q?", "A")]));
        assert!(s.is_summarized() && s.is_flashcarded());

        s.begin(Action::Upload).unwrap();
        s.upload_success(ExtractedContent::new("text B"));
        assert!(s.summary().is_none());
        assert!(s.flashcards().is_none());
        assert_eq!(s.content().map(|c| c.text.as_str()), Some("text B"));
    }

    #[test]
    fn branches_are_independent() {
        let mut s = loaded("text");
        s.begin(Action::Flashcards).unwrap();
        s.flashcards_success(FlashcardSet::new(vec![]));
        s.begin(Action::Summarize).unwrap();
        s.summarize_success(Summary::new("text", "t"));
        assert!(s.is_flashcarded());
        assert!(s.is_summarized());
    }

    #[test]
    fn failure_sets_banner_only() {
        let mut s = loaded("text");
        s.begin(Action::Summarize).unwrap();
        s.summarize_success(Summary::new("text", "t"));

        s.begin(Action::Flashcards).unwrap();
        s.failure(Action::Flashcards, "Number of cards must be between 1 and 10");
        assert_eq!(s.error(), Some("Number of cards must be between 1 and 10"));
        assert!(s.is_summarized());
        assert!(!s.is_pending(Action::Flashcards));

        s.begin(Action::Summarize).unwrap();
        assert!(s.error().is_none());
    }

    #[test]
    fn same_action_cannot_overlap() {
        let mut s = StudySession::new();
        s.begin(Action::Upload).unwrap();
        assert!(matches!(
            s.begin(Action::Upload),
            Err(ClientError::ActionPending(Action::Upload))
        ));
        // Unrelated actions may overlap.
        assert!(s.begin(Action::Summarize).is_ok());
    }
}
