//! Prompts for summarization and flashcard generation.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: wording changes touch exactly one place.
//!
//! 2. **Testability**: unit tests can inspect prompts directly without a
//!    live model, so prompt regressions are easy to catch.
//!
//! The user-turn templates are short instructions followed by the content,
//! which also works with small instruction-tuned models.

/// System prompt for every summarization call (single, chunk, condense).
pub const SUMMARY_SYSTEM_PROMPT: &str = r#"You are a study assistant that writes concise summaries of study material.

Rules:
- Write plain prose, one paragraph, no headings, no bullet points
- Keep only the key facts, definitions and conclusions
- Never invent information that is not in the text
- Do NOT add commentary, labels such as "Summary:", or quotes
- Start directly with the summary"#;

/// System prompt for flashcard questions and condensed answers.
pub const FLASHCARD_SYSTEM_PROMPT: &str = r#"You are a study assistant that writes flashcards.

Rules:
- Reply with exactly one line
- For questions: write one clear question that the given content answers
- For answers: write one sentence that keeps the essential fact
- Do NOT add labels such as "Question:" or "Answer:", numbering, or quotes"#;

/// Question templates, used in rotation by card index.
///
/// `{content}` is replaced with the card's source text.
pub const QUESTION_TEMPLATES: [&str; 5] = [
    "Create a question about this information: {content}",
    "What question would test understanding of: {content}",
    "Generate a quiz question for: {content}",
    "Ask about the key point in: {content}",
    "What would you ask to test knowledge of: {content}",
];

/// User turn for summarizing a short text or one chunk.
pub fn summarize_prompt(text: &str) -> String {
    format!("Summarize the following text:\n\n{text}")
}

/// User turn for the condensing pass over joined chunk summaries.
pub fn condense_prompt(key_points: &str) -> String {
    format!("Provide a comprehensive summary of the following key points: {key_points}")
}

/// User turn for the question of card `index` (0-based).
pub fn question_prompt(index: usize, content: &str) -> String {
    QUESTION_TEMPLATES[index % QUESTION_TEMPLATES.len()].replace("{content}", content)
}

/// User turn for shortening an over-long answer.
pub fn answer_prompt(content: &str) -> String {
    format!("Summarize this in one sentence: {content}")
}
