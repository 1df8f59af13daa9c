//! Client side of the service: typed HTTP calls plus the study session
//! state a UI renders.
//!
//! [`StudyController`] is the entry point: it sends requests through
//! [`ApiClient`] and applies each outcome to a [`StudySession`] with the
//! session's explicit transitions.

pub mod api;
pub mod controller;
pub mod deck;
pub mod error;
pub mod session;

pub use api::ApiClient;
pub use controller::StudyController;
pub use deck::FlashcardDeck;
pub use error::{ClientError, DEFAULT_ERROR_MESSAGE};
pub use session::{Action, Phase, StudySession};
