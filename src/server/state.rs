use crate::config::StudyConfig;
use crate::model::ModelSet;
use crate::pipeline::extract::DocumentExtractor;
use std::sync::Arc;

/// Shared application state accessible from all handlers.
///
/// Everything here is immutable after startup; handlers only clone `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<DocumentExtractor>,
    pub models: ModelSet,
    pub config: Arc<StudyConfig>,
}

impl AppState {
    pub fn new(extractor: DocumentExtractor, models: ModelSet, config: StudyConfig) -> Self {
        Self {
            extractor: Arc::new(extractor),
            models,
            config: Arc::new(config),
        }
    }
}
