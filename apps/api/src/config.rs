use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

/// Which vendor answers text-generation prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationProvider {
    Gemini,
    Anthropic,
}

impl FromStr for GenerationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(anyhow!("Unknown GENERATION_PROVIDER '{other}'")),
        }
    }
}

/// Which vendor turns summary text into audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechProvider {
    ElevenLabs,
    Murf,
}

impl FromStr for SpeechProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elevenlabs" | "eleven_labs" => Ok(Self::ElevenLabs),
            "murf" => Ok(Self::Murf),
            other => Err(anyhow!("Unknown SPEECH_PROVIDER '{other}'")),
        }
    }
}

/// Credentials for the selected speech vendor.
#[derive(Debug, Clone)]
pub enum SpeechCredentials {
    ElevenLabs { api_key: String, voice_id: String },
    Murf { api_key: String, voice_id: String },
}

/// Application configuration loaded from environment variables.
/// Startup fails if a key required by the selected providers is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub generation_provider: GenerationProvider,
    pub generation_api_key: String,
    pub speech: SpeechCredentials,
    pub exa_api_key: String,
    pub max_upload_bytes: usize,
    pub max_resume_chars: usize,
    pub http_timeout_secs: u64,
    pub max_sessions: usize,
}

const DEFAULT_MURF_VOICE: &str = "en-US-terrell";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let generation_provider: GenerationProvider = lookup("GENERATION_PROVIDER")
            .unwrap_or_else(|| "gemini".to_string())
            .parse()?;
        let generation_api_key = match generation_provider {
            GenerationProvider::Gemini => require("GEMINI_API_KEY")?,
            GenerationProvider::Anthropic => require("ANTHROPIC_API_KEY")?,
        };

        let speech_provider: SpeechProvider = lookup("SPEECH_PROVIDER")
            .unwrap_or_else(|| "elevenlabs".to_string())
            .parse()?;
        let speech = match speech_provider {
            SpeechProvider::ElevenLabs => SpeechCredentials::ElevenLabs {
                api_key: require("ELEVENLABS_API_KEY")?,
                voice_id: require("ELEVENLABS_VOICE_ID")?,
            },
            SpeechProvider::Murf => SpeechCredentials::Murf {
                api_key: require("MURF_API_KEY")?,
                voice_id: lookup("MURF_VOICE_ID").unwrap_or_else(|| DEFAULT_MURF_VOICE.to_string()),
            },
        };

        Ok(Config {
            port: parse_or(&lookup, "PORT", 3000)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            generation_provider,
            generation_api_key,
            speech,
            exa_api_key: require("EXA_API_KEY")?,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            max_resume_chars: parse_or(&lookup, "MAX_RESUME_CHARS", 30_000)?,
            http_timeout_secs: parse_or(&lookup, "HTTP_TIMEOUT_SECS", 120)?,
            max_sessions: parse_or(&lookup, "MAX_SESSIONS", 1000)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
