//! Flashcard generation: text → question/answer pairs.
//!
//! ## Flow
//!
//! 1. Normalise whitespace, split into sentences on `.`.
//! 2. Pick one content piece per card: every `step`-th sentence, or
//!    ~200-character chunks when there are fewer sentences than cards.
//! 3. Per piece, concurrently and in order: the model writes a question
//!    (rotating templates); the answer is the piece itself, or a one-sentence
//!    condensation when the piece is long.
//! 4. A failed card becomes a deterministic fill-in-the-blank card.
//! 5. Unused sentences pad the set up to the requested count.

use crate::config::StudyConfig;
use crate::error::{ChunkError, StudyError};
use crate::model::{ModelRequest, TextModel};
use crate::output::{Flashcard, FlashcardOutput, FlashcardSet, FlashcardStats};
use crate::pipeline::postprocess::{clean_answer, clean_question};
use crate::pipeline::text::{chunk_by_chars, is_blank, normalize_whitespace, split_sentences};
use crate::prompts::{answer_prompt, question_prompt, FLASHCARD_SYSTEM_PROMPT};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Card count used when the caller does not ask for one.
pub const DEFAULT_NUM_CARDS: usize = 5;

/// Question of cards padded from unused sentences.
pub const PADDING_QUESTION: &str = "What information is provided about this topic?";

const BLANK: &str = "_____";

/// Check `num_cards` against `1..=max_cards`.
pub fn validate_card_count(num_cards: usize, max_cards: usize) -> Result<(), StudyError> {
    if num_cards == 0 || num_cards > max_cards {
        Err(StudyError::InvalidCardCount {
            requested: num_cards,
            max: max_cards,
        })
    } else {
        Ok(())
    }
}

/// Generate up to `num_cards` flashcards from `text`.
///
/// Fewer cards come back only when the text is too short to supply
/// `num_cards` distinct pieces.
///
/// # Errors
/// - [`StudyError::EmptyText`] if `text` is blank.
/// - [`StudyError::InvalidCardCount`] if `num_cards` is outside `1..=max_cards`.
///
/// Model failures are never fatal here; they produce fallback cards.
pub async fn generate_flashcards(
    text: &str,
    num_cards: usize,
    model: &dyn TextModel,
    config: &StudyConfig,
) -> Result<FlashcardOutput, StudyError> {
    let start = Instant::now();
    if is_blank(text) {
        return Err(StudyError::EmptyText);
    }
    validate_card_count(num_cards, config.max_cards)?;

    let normalized = normalize_whitespace(text);
    let sentences = split_sentences(&normalized);
    let pieces = select_pieces(&normalized, &sentences, num_cards, config.piece_chars);
    debug!(
        "{} sentences, {} pieces for {} cards",
        sentences.len(),
        pieces.len(),
        num_cards
    );

    let results: Vec<(usize, String, Result<(Flashcard, u64, u64), StudyError>)> =
        stream::iter(pieces.clone().into_iter().enumerate())
            .map(|(idx, piece)| async move {
                let result = model_card(idx, &piece, model, config).await;
                (idx, piece, result)
            })
            .buffered(config.concurrency.max(1))
            .collect()
            .await;

    let mut stats = FlashcardStats {
        requested: num_cards,
        ..Default::default()
    };
    let mut cards: Vec<Flashcard> = Vec::with_capacity(num_cards);

    for (idx, piece, result) in results {
        match result {
            Ok((card, input_tokens, output_tokens)) => {
                stats.generated += 1;
                stats.input_tokens += input_tokens;
                stats.output_tokens += output_tokens;
                cards.push(card);
            }
            Err(e) => {
                warn!("Card {}: {}; using fallback card", idx + 1, e);
                stats.fallback += 1;
                stats.errors.push(ChunkError::CardFailed {
                    card: idx + 1,
                    detail: e.to_string(),
                });
                cards.push(fallback_card(&piece));
            }
        }
    }

    let used: HashSet<&str> = pieces.iter().map(String::as_str).collect();
    for sentence in &sentences {
        if cards.len() >= num_cards {
            break;
        }
        if !used.contains(sentence.as_str()) {
            cards.push(Flashcard::new(PADDING_QUESTION, sentence.as_str()));
            stats.padded += 1;
        }
    }
    cards.truncate(num_cards);

    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Generated {} flashcards ({} from model, {} fallback, {} padded, {}ms)",
        cards.len(),
        stats.generated,
        stats.fallback,
        stats.padded,
        stats.duration_ms
    );

    Ok(FlashcardOutput {
        set: FlashcardSet::new(cards),
        stats,
    })
}

/// One content piece per card.
fn select_pieces(
    text: &str,
    sentences: &[String],
    num_cards: usize,
    piece_chars: usize,
) -> Vec<String> {
    if sentences.len() < num_cards {
        chunk_by_chars(text, piece_chars)
            .into_iter()
            .take(num_cards)
            .collect()
    } else {
        let step = (sentences.len() / num_cards).max(1);
        sentences
            .iter()
            .step_by(step)
            .take(num_cards)
            .cloned()
            .collect()
    }
}

/// Ask the model for a question (and a condensed answer for long pieces).
async fn model_card(
    idx: usize,
    piece: &str,
    model: &dyn TextModel,
    config: &StudyConfig,
) -> Result<(Flashcard, u64, u64), StudyError> {
    let request = ModelRequest {
        system: FLASHCARD_SYSTEM_PROMPT,
        prompt: question_prompt(idx, piece),
        temperature: config.question_temperature,
        max_tokens: config.question_tokens,
    };
    let generation = model.generate(&request).await?;
    let mut input_tokens = generation.input_tokens;
    let mut output_tokens = generation.output_tokens;

    let question = clean_question(&generation.text);
    if question.trim_end_matches('?').trim().is_empty() {
        return Err(StudyError::EmptyModelOutput {
            model: model.name().to_string(),
        });
    }

    let answer = if piece.chars().count() > config.long_answer_chars {
        let request = ModelRequest {
            system: FLASHCARD_SYSTEM_PROMPT,
            prompt: answer_prompt(piece),
            temperature: config.answer_temperature,
            max_tokens: config.answer_tokens,
        };
        let generation = model.generate(&request).await?;
        input_tokens += generation.input_tokens;
        output_tokens += generation.output_tokens;
        let answer = clean_answer(&generation.text);
        if is_blank(&answer) {
            return Err(StudyError::EmptyModelOutput {
                model: model.name().to_string(),
            });
        }
        answer
    } else {
        piece.to_string()
    };

    Ok((Flashcard::new(question, answer), input_tokens, output_tokens))
}

/// Deterministic card for a piece the model could not handle.
///
/// More than five words: blank out the middle word and ask for it.
/// Otherwise: ask what the statement describes.
pub fn fallback_card(piece: &str) -> Flashcard {
    let words: Vec<&str> = piece.split_whitespace().collect();
    if words.len() > 5 {
        let mid = words.len() / 2;
        let blanked: Vec<&str> = words
            .iter()
            .enumerate()
            .map(|(i, w)| if i == mid { BLANK } else { *w })
            .collect();
        Flashcard::new(
            format!("Fill in the blank: {}?", blanked.join(" ")),
            words[mid],
        )
    } else {
        Flashcard::new(
            format!("What does this statement describe: '{}'?", piece.trim()),
            "The information provided in the text.",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Generation;
    use async_trait::async_trait;
    use std::sync::Mutex;

    type Reply = Box<dyn Fn(&ModelRequest) -> Result<String, StudyError> + Send + Sync>;

    struct Scripted {
        reply: Reply,
        requests: Mutex<Vec<ModelRequest>>,
    }

    impl Scripted {
        fn new(
            reply: impl Fn(&ModelRequest) -> Result<String, StudyError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                reply: Box::new(reply),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextModel for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: &ModelRequest) -> Result<Generation, StudyError> {
            self.requests.lock().unwrap().push(request.clone());
            (self.reply)(request).map(|text| Generation {
                text,
                input_tokens: 4,
                output_tokens: 2,
            })
        }
    }

    fn failure() -> StudyError {
        StudyError::ModelFailed {
            model: "scripted".into(),
            attempts: 1,
            message: "rate limited".into(),
        }
    }

    const TEXT: &str = "Mitochondria produce energy for the cell. \
        The nucleus stores genetic material. Ribosomes build proteins from amino acids. \
        The cell membrane controls what enters the cell. Chloroplasts capture light in plants. \
        The cytoplasm holds the organelles in place. Lysosomes break down waste material. \
        The Golgi apparatus packages proteins for transport. Vacuoles store water and nutrients. \
        The cell wall gives plant cells their rigid shape.";

    #[tokio::test]
    async fn five_cards_by_default() {
        let model = Scripted::new(|_| Ok("What does this organelle do".into()));
        let out = generate_flashcards(TEXT, DEFAULT_NUM_CARDS, &model, &StudyConfig::default())
            .await
            .unwrap();

        assert_eq!(out.set.flashcards.len(), 5);
        assert_eq!(out.set.total_count, 5);
        assert_eq!(out.stats.generated, 5);
        for card in &out.set.flashcards {
            assert!(card.question.ends_with('?'));
        }
        // 10 sentences, 5 cards → every second sentence
        assert_eq!(
            out.set.flashcards[1].answer,
            "Ribosomes build proteins from amino acids"
        );
    }

    #[tokio::test]
    async fn generation_runs_on_spawned_task() {
        let model: std::sync::Arc<dyn TextModel> =
            std::sync::Arc::new(Scripted::new(|_| Ok("Which organelle is this".into())));
        let config = StudyConfig::default();

        let handle = tokio::spawn(async move {
            generate_flashcards(TEXT, 4, model.as_ref(), &config).await
        });
        let out = handle.await.unwrap().unwrap();
        assert_eq!(out.set.total_count, 4);
        assert_eq!(out.stats.generated, 4);
    }

    #[tokio::test]
    async fn templates_rotate_with_card_index() {
        let model = Scripted::new(|_| Ok("Q?".into()));
        generate_flashcards(TEXT, 6, &model, &StudyConfig::default())
            .await
            .unwrap();

        let requests = model.requests.lock().unwrap();
        let prompt_for = |sentence: &str| {
            requests
                .iter()
                .map(|r| r.prompt.as_str())
                .find(|p| p.ends_with(sentence))
                .unwrap()
                .to_string()
        };
        // 10 sentences, 6 cards → step 1, sentences 0..6
        assert!(prompt_for("Mitochondria produce energy for the cell")
            .starts_with("Create a question about this information:"));
        assert!(prompt_for("The nucleus stores genetic material")
            .starts_with("What question would test understanding of:"));
        assert!(prompt_for("The cytoplasm holds the organelles in place")
            .starts_with("Create a question about this information:"));
        assert_eq!(requests.len(), 6);
        assert!(requests.iter().all(|r| r.temperature == 0.8 && r.max_tokens == 50));
    }

    #[tokio::test]
    async fn invalid_card_counts_are_rejected() {
        let model = Scripted::new(|_| Ok("Q?".into()));
        let config = StudyConfig::default();
        for n in [0, 11] {
            let err = generate_flashcards(TEXT, n, &model, &config).await.unwrap_err();
            assert!(matches!(err, StudyError::InvalidCardCount { .. }), "n = {n}");
        }
        assert!(model.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        let model = Scripted::new(|_| Ok("Q?".into()));
        let err = generate_flashcards(" ", 5, &model, &StudyConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StudyError::EmptyText));
    }

    #[tokio::test]
    async fn failures_become_fallback_cards() {
        let model = Scripted::new(|_| Err(failure()));
        let out = generate_flashcards(TEXT, 2, &model, &StudyConfig::default())
            .await
            .unwrap();

        assert_eq!(out.set.total_count, 2);
        assert_eq!(out.stats.fallback, 2);
        assert_eq!(out.stats.errors.len(), 2);
        let first = &out.set.flashcards[0];
        assert_eq!(
            first.question,
            "Fill in the blank: Mitochondria produce energy _____ the cell?"
        );
        assert_eq!(first.answer, "for");
    }

    #[tokio::test]
    async fn long_pieces_get_condensed_answers() {
        let long_sentence = format!("{} end", "word ".repeat(40));
        let text = format!("{long_sentence}. Short one. Another short one.");
        let model = Scripted::new(|r| {
            if r.prompt.starts_with("Summarize this in one sentence:") {
                Ok("Answer: \"Words repeat.\"".into())
            } else {
                Ok("Question: What repeats?".into())
            }
        });

        let out = generate_flashcards(&text, 1, &model, &StudyConfig::default())
            .await
            .unwrap();
        let card = &out.set.flashcards[0];
        assert_eq!(card.question, "What repeats?");
        assert_eq!(card.answer, "Words repeat.");

        let requests = model.requests.lock().unwrap();
        let condense = requests
            .iter()
            .find(|r| r.prompt.starts_with("Summarize this in one sentence:"))
            .unwrap();
        assert_eq!(condense.temperature, 0.3);
        assert_eq!(condense.max_tokens, 30);
    }

    #[tokio::test]
    async fn short_text_is_padded_from_sentences() {
        let text = "Water boils at one hundred degrees. Ice melts at zero degrees. Steam is hot";
        let model = Scripted::new(|_| Ok("What is described?".into()));
        let out = generate_flashcards(text, 5, &model, &StudyConfig::default())
            .await
            .unwrap();

        // 3 sentences < 5 cards → one 200-char piece, then 3 padded sentences
        assert_eq!(out.set.total_count, 4);
        assert_eq!(out.set.total_count, out.set.flashcards.len());
        assert_eq!(out.stats.padded, 3);
        assert_eq!(out.set.flashcards[1].question, PADDING_QUESTION);
        assert_eq!(
            out.set.flashcards[1].answer,
            "Water boils at one hundred degrees"
        );
    }

    #[test]
    fn fallback_card_short_piece() {
        let card = fallback_card("Photosynthesis makes sugar");
        assert_eq!(
            card.question,
            "What does this statement describe: 'Photosynthesis makes sugar'?"
        );
        assert_eq!(card.answer, "The information provided in the text.");
    }

    #[test]
    fn pieces_step_through_sentences() {
        let sentences: Vec<String> = (0..7).map(|i| format!("s{i}")).collect();
        assert_eq!(
            select_pieces("", &sentences, 3, 200),
            vec!["s0", "s2", "s4"]
        );
    }

    #[test]
    fn card_count_bounds() {
        assert!(validate_card_count(1, 10).is_ok());
        assert!(validate_card_count(10, 10).is_ok());
        assert!(validate_card_count(11, 10).is_err());
        assert!(validate_card_count(0, 10).is_err());
    }
}
