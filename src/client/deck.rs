use crate::output::{Flashcard, FlashcardSet};

/// Study view over a flashcard set: one current card, question or answer
/// side up. Moving to another card turns it question side up.
#[derive(Debug, Clone)]
pub struct FlashcardDeck {
    cards: Vec<Flashcard>,
    index: usize,
    flipped: bool,
}

impl FlashcardDeck {
    pub fn new(set: &FlashcardSet) -> Self {
        Self {
            cards: set.flashcards.clone(),
            index: 0,
            flipped: false,
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn current(&self) -> Option<&Flashcard> {
        self.cards.get(self.index)
    }

    /// 1-based position of the current card.
    pub fn position(&self) -> usize {
        if self.cards.is_empty() {
            0
        } else {
            self.index + 1
        }
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    /// Text on the visible side of the current card.
    pub fn visible_side(&self) -> Option<&str> {
        self.current().map(|c| {
            if self.flipped {
                c.answer.as_str()
            } else {
                c.question.as_str()
            }
        })
    }

    pub fn flip(&mut self) {
        if !self.cards.is_empty() {
            self.flipped = !self.flipped;
        }
    }

    /// Advance; returns false on the last card.
    pub fn next(&mut self) -> bool {
        if self.index + 1 < self.cards.len() {
            self.index += 1;
            self.flipped = false;
            true
        } else {
            false
        }
    }

    /// Go back; returns false on the first card.
    pub fn previous(&mut self) -> bool {
        if self.index > 0 {
            self.index -= 1;
            self.flipped = false;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.flipped = false;
    }
}
