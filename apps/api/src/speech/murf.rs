//! Murf AI backend. The generate call answers with a URL to the rendered file,
//! which is then downloaded.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{SpeechError, SpeechSynthesizer};

const MURF_GENERATE_URL: &str = "https://api.murf.ai/v1/speech/generate";
const MAX_INPUT_CHARS: usize = 3000;

pub struct MurfTts {
    client: Client,
    api_key: String,
    voice_id: String,
}

impl MurfTts {
    pub fn new(client: Client, api_key: String, voice_id: String) -> Self {
        Self {
            client,
            api_key,
            voice_id,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MurfRequest<'a> {
    voice_id: &'a str,
    style: &'static str,
    text: &'a str,
    format: &'static str,
    sample_rate: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MurfResponse {
    pub audio_file: Option<String>,
}

/// The download URL, if the vendor produced one.
pub fn audio_url(body: &str) -> Result<String, SpeechError> {
    serde_json::from_str::<MurfResponse>(body)
        .ok()
        .and_then(|r| r.audio_file)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| SpeechError::MissingAudio(body.to_string()))
}

#[async_trait]
impl SpeechSynthesizer for MurfTts {
    async fn synthesize(&self, text: &str) -> Result<Bytes, SpeechError> {
        let request = MurfRequest {
            voice_id: &self.voice_id,
            style: "Conversational",
            text,
            format: "MP3",
            sample_rate: 48_000,
        };

        let response = self
            .client
            .post(MURF_GENERATE_URL)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SpeechError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let url = audio_url(&body)?;
        debug!("Murf audio ready at {url}");

        let audio = self.client.get(&url).send().await?.error_for_status()?;
        Ok(audio.bytes().await?)
    }

    fn max_input_chars(&self) -> usize {
        MAX_INPUT_CHARS
    }

    fn name(&self) -> &'static str {
        "Murf"
    }
}
