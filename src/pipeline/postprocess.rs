//! Post-processing: deterministic cleanup of model-generated text.
//!
//! Even well-prompted models wrap answers in artefacts: code fences,
//! surrounding quotes, `Question:` labels, stray zero-width characters.
//! These passes remove them without touching content, so prompts can stay
//! focused on *what to write* rather than on formatting edge cases.
//!
//! ## Rule order
//!
//! Fences are stripped before line endings are normalised so the fence
//! regex sees the raw output; labels are stripped before quotes because
//! models write `Question: "…"` far more often than `"Question: …"`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::text::normalize_whitespace;

/// Clean a generated summary: one paragraph of plain prose.
pub fn clean_summary(input: &str) -> String {
    let s = strip_code_fences(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = strip_label(&s, &RE_SUMMARY_LABEL);
    let s = strip_wrapping_quotes(&s);
    normalize_whitespace(&s)
}

/// Clean a generated question and guarantee it ends with `?`.
pub fn clean_question(input: &str) -> String {
    let s = strip_code_fences(input);
    let s = remove_invisible_chars(&s);
    // Models sometimes emit "Question: …\nAnswer: …"; keep only the first line.
    let first = s.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let s = strip_label(first, &RE_QUESTION_LABEL);
    let s = strip_wrapping_quotes(&s);
    ensure_question_mark(&normalize_whitespace(&s))
}

/// Clean a generated one-sentence answer.
pub fn clean_answer(input: &str) -> String {
    let s = strip_code_fences(input);
    let s = remove_invisible_chars(&s);
    let s = strip_label(&s, &RE_ANSWER_LABEL);
    let s = strip_wrapping_quotes(&s);
    normalize_whitespace(&s)
}

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\n(.*)\n```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Strip leading labels ────────────────────────────────────────────

static RE_SUMMARY_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:\*\*)?summary(?:\*\*)?\s*:\s*").unwrap());
static RE_QUESTION_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:\*\*)?(?:question|q)\s*\d*(?:\*\*)?\s*[:.)]\s*").unwrap());
static RE_ANSWER_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:\*\*)?(?:answer|a)(?:\*\*)?\s*:\s*").unwrap());

fn strip_label(input: &str, label: &Regex) -> String {
    label.replace(input, "").into_owned()
}

// ── Rule 5: Strip wrapping quotes ───────────────────────────────────────────

fn strip_wrapping_quotes(input: &str) -> String {
    let t = input.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”'), ('«', '»')] {
        if t.len() >= 2 && t.starts_with(open) && t.ends_with(close) {
            let inner = &t[open.len_utf8()..t.len() - close.len_utf8()];
            return inner.trim().to_string();
        }
    }
    t.to_string()
}

// ── Rule 6: Question mark ───────────────────────────────────────────────────

fn ensure_question_mark(input: &str) -> String {
    let t = input.trim_end_matches(['.', ' ']);
    if t.ends_with('?') {
        t.to_string()
    } else {
        format!("{t}?")
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
