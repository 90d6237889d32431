mod advice;
mod config;
mod errors;
mod extract;
mod llm_client;
mod routes;
mod search;
mod session;
mod speech;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, GenerationProvider, SpeechCredentials};
use crate::extract::PdfTextExtractor;
use crate::llm_client::{AnthropicClient, GeminiClient, TextGenerator};
use crate::routes::build_router;
use crate::search::ExaClient;
use crate::session::SessionStore;
use crate::speech::{ElevenLabsTts, MurfTts, SpeechSynthesizer};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Professor Doom API v{}", env!("CARGO_PKG_VERSION"));

    // One pooled HTTP client for every upstream vendor
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let llm: Arc<dyn TextGenerator> = match config.generation_provider {
        GenerationProvider::Gemini => Arc::new(GeminiClient::new(
            http.clone(),
            config.generation_api_key.clone(),
        )),
        GenerationProvider::Anthropic => Arc::new(AnthropicClient::new(
            http.clone(),
            config.generation_api_key.clone(),
        )),
    };
    info!("LLM client initialized (model: {})", llm.model());

    let speech: Arc<dyn SpeechSynthesizer> = match &config.speech {
        SpeechCredentials::ElevenLabs { api_key, voice_id } => Arc::new(ElevenLabsTts::new(
            http.clone(),
            api_key.clone(),
            voice_id.clone(),
        )),
        SpeechCredentials::Murf { api_key, voice_id } => Arc::new(MurfTts::new(
            http.clone(),
            api_key.clone(),
            voice_id.clone(),
        )),
    };
    info!("TTS client initialized ({})", speech.name());

    let search = Arc::new(ExaClient::new(http, config.exa_api_key.clone()));

    // Build app state
    let state = AppState {
        llm,
        speech,
        search,
        extractor: Arc::new(PdfTextExtractor),
        sessions: SessionStore::new(config.max_sessions),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
