//! Result types shared by the library, the HTTP service and the client.
//!
//! The wire types ([`ExtractedContent`], [`Summary`], [`FlashcardSet`]) are
//! exactly what the HTTP endpoints return. The `*Output` types wrap them
//! with per-run statistics for library and CLI callers.

use crate::error::{ChunkError, StudyError};
use crate::pipeline::text::{is_blank, word_count};
use serde::{Deserialize, Serialize};

/// Plain text produced by `/upload`, from a PDF or from pasted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub text: String,
    #[serde(default)]
    pub word_count: usize,
    #[serde(default)]
    pub char_count: usize,
}

impl ExtractedContent {
    /// Wrap text and derive its counts.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            word_count: word_count(&text),
            char_count: text.chars().count(),
            text,
        }
    }

    /// Like [`ExtractedContent::new`], but rejects blank text and text
    /// longer than `max_words` words.
    pub fn checked(text: impl Into<String>, max_words: usize) -> Result<Self, StudyError> {
        let content = Self::new(text);
        if is_blank(&content.text) {
            return Err(StudyError::EmptyText);
        }
        if content.word_count > max_words {
            return Err(StudyError::TextTooLarge {
                words: content.word_count,
                max: max_words,
            });
        }
        Ok(content)
    }
}

/// A generated summary plus word-count metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
    /// Words in the text that was summarised.
    pub original_length: usize,
    /// Words in `summary`.
    pub summary_length: usize,
}

impl Summary {
    pub fn new(original: &str, summary: impl Into<String>) -> Self {
        let summary = summary.into();
        Self {
            original_length: word_count(original),
            summary_length: word_count(&summary),
            summary,
        }
    }
}

/// One question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

impl Flashcard {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// A list of flashcards. `total_count` always equals `flashcards.len()`
/// when built through [`FlashcardSet::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardSet {
    pub flashcards: Vec<Flashcard>,
    pub total_count: usize,
}

impl FlashcardSet {
    pub fn new(flashcards: Vec<Flashcard>) -> Self {
        Self {
            total_count: flashcards.len(),
            flashcards,
        }
    }

    pub fn len(&self) -> usize {
        self.flashcards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flashcards.is_empty()
    }
}

/// Body of `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub message: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: String,
}

/// Statistics for one summarization run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Number of chunks the text was split into (1 for short texts).
    pub chunks: usize,
    /// Chunks whose summary came from the sentence fallback.
    pub failed_chunks: usize,
    /// Whether the joined chunk summaries went through a condensing pass.
    pub condensed: bool,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
    /// Non-fatal failures, in chunk order.
    pub errors: Vec<ChunkError>,
}

/// Summary plus run statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub summary: Summary,
    pub stats: SummaryStats,
}

/// Statistics for one flashcard run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlashcardStats {
    pub requested: usize,
    /// Cards produced by the model (the rest are fallbacks or padding).
    pub generated: usize,
    pub fallback: usize,
    pub padded: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
    pub errors: Vec<ChunkError>,
}

/// Flashcards plus run statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardOutput {
    pub set: FlashcardSet,
    pub stats: FlashcardStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flashcard_set_counts_its_cards() {
        let set = FlashcardSet::new(vec![
            Flashcard::new("What is Rust?", "A language"),
            Flashcard::new("Who maintains it?", "The Rust project"),
        ]);
        assert_eq!(set.total_count, 2);
        assert_eq!(set.total_count, set.flashcards.len());
    }

    #[test]
    fn summary_lengths_are_word_counts() {
        let s = Summary::new("one two three four five", "one two");
        assert_eq!(s.original_length, 5);
        assert_eq!(s.summary_length, 2);
    }

    #[test]
    fn extracted_content_counts() {
        let c = ExtractedContent::new("héllo  world\n");
        assert_eq!(c.word_count, 2);
        assert_eq!(c.char_count, 13);
    }

    #[test]
    fn wire_shape_of_flashcard_set() {
        let set = FlashcardSet::new(vec![Flashcard::new("Q?", "A")]);
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "flashcards": [{"question": "Q?", "answer": "A"}],
                "total_count": 1
            })
        );
    }

    #[test]
    fn checked_content_limits() {
        assert!(matches!(
            ExtractedContent::checked(" \n", 10),
            Err(StudyError::EmptyText)
        ));
        assert!(matches!(
            ExtractedContent::checked("a b c", 2),
            Err(StudyError::TextTooLarge { words: 3, max: 2 })
        ));
        assert_eq!(ExtractedContent::checked("a b", 2).unwrap().word_count, 2);
    }

    #[test]
    fn extracted_content_accepts_text_only_body() {
        let c: ExtractedContent = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(c.text, "hi");
        assert_eq!(c.word_count, 0);
    }
}
