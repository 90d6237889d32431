use std::sync::Arc;

use crate::config::Config;
use crate::extract::TextExtractor;
use crate::llm_client::TextGenerator;
use crate::search::ResourceSearch;
use crate::session::SessionStore;
use crate::speech::SpeechSynthesizer;

/// Shared application state injected into all route handlers via Axum extractors.
/// Every external service sits behind a trait object chosen at startup.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn TextGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub search: Arc<dyn ResourceSearch>,
    pub extractor: Arc<dyn TextExtractor>,
    /// In-memory sessions for the stateful Summary Room flow.
    pub sessions: SessionStore,
    pub config: Config,
}
