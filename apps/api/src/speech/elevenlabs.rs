use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Serialize;

use super::{SpeechError, SpeechSynthesizer, AUDIO_MIME};

const ELEVENLABS_API_BASE: &str = "https://api.elevenlabs.io/v1/text-to-speech";
const ELEVENLABS_MODEL: &str = "eleven_multilingual_v2";
const MAX_INPUT_CHARS: usize = 5000;

pub struct ElevenLabsTts {
    client: Client,
    api_key: String,
    voice_id: String,
}

impl ElevenLabsTts {
    pub fn new(client: Client, api_key: String, voice_id: String) -> Self {
        Self {
            client,
            api_key,
            voice_id,
        }
    }
}

#[derive(Serialize)]
struct ElevenLabsBody<'a> {
    text: &'a str,
    model_id: &'static str,
    voice_settings: VoiceSettings,
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsTts {
    async fn synthesize(&self, text: &str) -> Result<Bytes, SpeechError> {
        let body = ElevenLabsBody {
            text,
            model_id: ELEVENLABS_MODEL,
            voice_settings: VoiceSettings {
                stability: 0.3,
                similarity_boost: 0.8,
                style: 0.5,
            },
        };

        let response = self
            .client
            .post(format!("{ELEVENLABS_API_BASE}/{}", self.voice_id))
            .header("xi-api-key", &self.api_key)
            .header("accept", AUDIO_MIME)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpeechError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.bytes().await?)
    }

    fn max_input_chars(&self) -> usize {
        MAX_INPUT_CHARS
    }

    fn name(&self) -> &'static str {
        "ElevenLabs"
    }
}
