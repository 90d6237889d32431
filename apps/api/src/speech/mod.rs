//! Text-to-speech adapters.
//!
//! One vendor is active per process, chosen by `SPEECH_PROVIDER`.
//! Callers go through `synthesize_speech`, which applies the vendor's input cap.

use std::borrow::Cow;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use crate::errors::AppError;

pub mod elevenlabs;
pub mod murf;

pub use elevenlabs::ElevenLabsTts;
pub use murf::MurfTts;

pub const AUDIO_MIME: &str = "audio/mpeg";

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("No audio file in response: {0}")]
    MissingAudio(String),
}

impl From<SpeechError> for AppError {
    fn from(err: SpeechError) -> Self {
        AppError::UpstreamSpeech {
            detail: err.to_string(),
        }
    }
}

/// Returns MP3 bytes for the given text.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Bytes, SpeechError>;

    /// Longest input the vendor accepts in one request, in characters.
    fn max_input_chars(&self) -> usize;

    fn name(&self) -> &'static str;
}

/// Cuts `text` to `max_chars` characters, marking the cut with `...`.
pub fn truncate_for_speech(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => Cow::Owned(format!("{}...", &text[..cut])),
        None => Cow::Borrowed(text),
    }
}

pub async fn synthesize_speech(
    synthesizer: &dyn SpeechSynthesizer,
    text: &str,
) -> Result<Bytes, AppError> {
    let text = truncate_for_speech(text, synthesizer.max_input_chars());
    info!(
        "[TTS/{}] Synthesizing {} characters",
        synthesizer.name(),
        text.chars().count()
    );
    Ok(synthesizer.synthesize(&text).await?)
}
