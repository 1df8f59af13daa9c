//! Request handlers for the four endpoints.

use crate::flashcards::{generate_flashcards, validate_card_count, DEFAULT_NUM_CARDS};
use crate::output::{ExtractedContent, FlashcardSet, HealthStatus, Summary};
use crate::pipeline::extract::extract_pdf_text;
use crate::pipeline::text::is_blank;
use crate::server::error::ApiError;
use crate::server::state::AppState;
use crate::server::upload::parse_multipart;
use crate::summarize::summarize;
use crate::StudyError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Message returned by the health check.
pub const HEALTH_MESSAGE: &str = "PDF Flashcards API is running";

/// Detail for `/summarize` and `/flashcards` requests with blank text.
pub const TEXT_REQUIRED: &str = "Text content is required";

/// JSON body of `/summarize` and `/flashcards`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

/// Query string of `/flashcards`.
#[derive(Debug, Deserialize)]
pub struct FlashcardsQuery {
    pub num_cards: Option<usize>,
}

fn json_body(body: Result<Json<TextRequest>, JsonRejection>) -> Result<TextRequest, ApiError> {
    match body {
        Ok(Json(req)) => Ok(req),
        Err(rejection) => Err(ApiError::new(rejection.status(), rejection.body_text())),
    }
}

/// `GET /`
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        message: HEALTH_MESSAGE.to_string(),
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /upload`: a PDF file or pasted text → plain text with counts.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractedContent>, ApiError> {
    let multipart = multipart.map_err(|r| ApiError::new(r.status(), r.body_text()))?;
    let form = parse_multipart(multipart)
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?;

    let text = match (form.file, form.text) {
        (Some(file), _) => {
            if !file.is_pdf() {
                return Err(ApiError::bad_request(
                    StudyError::UnsupportedFileType {
                        content_type: file.content_type.unwrap_or_default(),
                    }
                    .to_string(),
                ));
            }
            info!("Extracting text from '{}' ({} bytes)", file.filename, file.data.len());
            extract_pdf_text(state.extractor.clone(), file.data)
                .await
                .map_err(|e| ApiError::bad_request(format!("Error processing PDF: {e}")))?
        }
        (None, Some(text)) => text,
        (None, None) => return Err(ApiError::bad_request(StudyError::MissingInput.to_string())),
    };

    let content = ExtractedContent::checked(text, state.config.max_words)
        .map_err(|e| ApiError::from_study(e, "Upload failed"))?;
    info!(
        "Upload accepted: {} words, {} chars",
        content.word_count, content.char_count
    );
    Ok(Json(content))
}

/// `POST /summarize`
pub async fn summarize_text(
    State(state): State<AppState>,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<Summary>, ApiError> {
    let req = json_body(body)?;
    if is_blank(&req.text) {
        return Err(ApiError::bad_request(TEXT_REQUIRED));
    }

    let output = summarize(&req.text, state.models.summarizer.as_ref(), &state.config)
        .await
        .map_err(|e| ApiError::from_study(e, "Summary generation failed"))?;
    Ok(Json(output.summary))
}

/// `POST /flashcards?num_cards=N`
pub async fn flashcards(
    State(state): State<AppState>,
    query: Result<Query<FlashcardsQuery>, QueryRejection>,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<FlashcardSet>, ApiError> {
    let Query(query) = query.map_err(|r| ApiError::new(r.status(), r.body_text()))?;
    let req = json_body(body)?;
    if is_blank(&req.text) {
        return Err(ApiError::bad_request(TEXT_REQUIRED));
    }

    let num_cards = query.num_cards.unwrap_or(DEFAULT_NUM_CARDS);
    validate_card_count(num_cards, state.config.max_cards)
        .map_err(|e| ApiError::from_study(e, "Flashcard generation failed"))?;

    let output = generate_flashcards(
        &req.text,
        num_cards,
        state.models.flashcards.as_ref(),
        &state.config,
    )
    .await
    .map_err(|e| ApiError::from_study(e, "Flashcard generation failed"))?;
    Ok(Json(output.set))
}
