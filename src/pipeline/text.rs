//! Plain-text utilities: normalisation, counting, chunking, sentences.
//!
//! Every length in this crate is measured the same way the HTTP contract
//! measures it: a *word* is a maximal run of non-whitespace characters, and
//! character budgets count Unicode scalar values, not bytes.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse every whitespace run to a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Number of whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// True when `text` contains nothing but whitespace.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Greedy word packing into chunks of at most `max_chars` characters
/// (each word costs its length plus one separator).
///
/// A single word longer than `max_chars` still gets its own chunk; words are
/// never split.
pub fn chunk_by_chars(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let cost = word.chars().count() + 1;
        if current_len + cost > max_chars && !current.is_empty() {
            chunks.push(current.join(" "));
            current.clear();
            current_len = 0;
        }
        current.push(word);
        current_len += cost;
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}

/// Split into windows of `window` words where consecutive windows share
/// `overlap` words.
///
/// The last window always ends at the final word. When `overlap >= window`
/// the stride falls back to one word so the loop always advances.
pub fn chunk_words_with_overlap(text: &str, window: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let window = window.max(1);
    let stride = window.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < words.len() {
        let end = (start + window).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += stride;
    }
    chunks
}

/// Sentences split on `.`, trimmed, empty pieces dropped.
///
/// Deliberately naive: abbreviations and decimals split too. The flashcard
/// picker only needs roughly sentence-sized pieces.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// The first `n` sentences of `text` (split on `". "`), terminated by a period.
pub fn leading_sentences(text: &str, n: usize) -> String {
    let sentences: Vec<&str> = text.split(". ").take(n).collect();
    let joined = sentences.join(". ");
    let joined = joined.trim_end_matches('.');
    format!("{joined}.")
}

/// Keep the first `max_words` words; append `...` when something was cut.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > max_words {
        format!("{}...", words[..max_words].join(" "))
    } else {
        text.to_string()
    }
}

/// Prefix of `text` with at most `max_chars` characters, cut on a char boundary.
pub fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
