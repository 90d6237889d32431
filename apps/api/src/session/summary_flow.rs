//! Summary Room wizard.
//!
//! SelectGender → SelectLanguage → ReadyToGenerate → Generating → Result.
//! Result may re-enter Generating (regenerate). A failed generation drops back
//! to ReadyToGenerate with the error kept for the retry prompt.
//! Cached audio lives inside `Result` alongside the text it was made from, so
//! regenerating can never leave stale audio behind.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Pronoun set written verbatim into the summary prompt.
    pub fn pronouns(&self) -> &'static str {
        match self {
            Gender::Male => "he/him/his",
            Gender::Female => "she/her/her",
            Gender::Other => "they/them/their",
        }
    }
}

impl FromStr for Gender {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(AppError::BadRequest(format!(
                "Unsupported gender '{other}'; expected male, female or other"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Hindi,
    Bengali,
    French,
    Spanish,
}

impl Language {
    /// Language name as given to the model.
    pub fn prompt_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi (Hinglish is fine)",
            Language::Bengali => "Bengali",
            Language::French => "French",
            Language::Spanish => "Spanish",
        }
    }
}

impl FromStr for Language {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "english" => Ok(Language::English),
            "hindi" => Ok(Language::Hindi),
            "bengali" => Ok(Language::Bengali),
            "french" => Ok(Language::French),
            "spanish" => Ok(Language::Spanish),
            other => Err(AppError::BadRequest(format!(
                "Unsupported language '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SummaryStep {
    SelectGender,
    SelectLanguage,
    ReadyToGenerate,
    Generating,
    Result,
}

impl fmt::Display for SummaryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SummaryStep::SelectGender => "selecting gender",
            SummaryStep::SelectLanguage => "selecting language",
            SummaryStep::ReadyToGenerate => "ready to generate",
            SummaryStep::Generating => "generating",
            SummaryStep::Result => "showing the result",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryFlow {
    SelectGender,
    SelectLanguage {
        gender: Gender,
    },
    ReadyToGenerate {
        gender: Gender,
        language: Language,
        last_error: Option<String>,
    },
    Generating {
        gender: Gender,
        language: Language,
    },
    Result {
        gender: Gender,
        language: Language,
        summary: String,
        audio: Option<Bytes>,
    },
}

/// Serializable snapshot of the wizard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryState {
    pub step: SummaryStep,
    pub gender: Option<Gender>,
    pub language: Option<Language>,
    pub summary_text: Option<String>,
    pub has_audio: bool,
    pub last_error: Option<String>,
}

impl SummaryFlow {
    /// A fresh wizard with everything unset.
    pub fn start() -> Self {
        SummaryFlow::SelectGender
    }

    pub fn step(&self) -> SummaryStep {
        match self {
            SummaryFlow::SelectGender => SummaryStep::SelectGender,
            SummaryFlow::SelectLanguage { .. } => SummaryStep::SelectLanguage,
            SummaryFlow::ReadyToGenerate { .. } => SummaryStep::ReadyToGenerate,
            SummaryFlow::Generating { .. } => SummaryStep::Generating,
            SummaryFlow::Result { .. } => SummaryStep::Result,
        }
    }

    pub fn select_gender(&mut self, gender: Gender) -> Result<(), AppError> {
        match self {
            SummaryFlow::SelectGender => {
                *self = SummaryFlow::SelectLanguage { gender };
                Ok(())
            }
            _ => Err(self.invalid("select a gender")),
        }
    }

    pub fn select_language(&mut self, language: Language) -> Result<(), AppError> {
        match *self {
            SummaryFlow::SelectLanguage { gender } => {
                *self = SummaryFlow::ReadyToGenerate {
                    gender,
                    language,
                    last_error: None,
                };
                Ok(())
            }
            _ => Err(self.invalid("select a language")),
        }
    }

    /// Enters `Generating` from `ReadyToGenerate` or `Result` (regenerate).
    /// Regenerating discards the previous text and any audio made from it.
    pub fn begin_generation(&mut self) -> Result<(Gender, Language), AppError> {
        match *self {
            SummaryFlow::ReadyToGenerate {
                gender, language, ..
            }
            | SummaryFlow::Result {
                gender, language, ..
            } => {
                *self = SummaryFlow::Generating { gender, language };
                Ok((gender, language))
            }
            _ => Err(self.invalid("generate a summary")),
        }
    }

    /// Leaves `Generating` with the outcome of the upstream call.
    pub fn finish_generation(&mut self, outcome: Result<String, String>) -> Result<(), AppError> {
        let SummaryFlow::Generating { gender, language } = *self else {
            return Err(self.invalid("finish generating"));
        };
        *self = match outcome {
            Ok(summary) => SummaryFlow::Result {
                gender,
                language,
                summary,
                audio: None,
            },
            Err(error) => SummaryFlow::ReadyToGenerate {
                gender,
                language,
                last_error: Some(error),
            },
        };
        Ok(())
    }

    pub fn summary_text(&self) -> Option<&str> {
        match self {
            SummaryFlow::Result { summary, .. } => Some(summary),
            _ => None,
        }
    }

    /// Caches audio synthesized from the current summary text.
    pub fn attach_audio(&mut self, bytes: Bytes) -> Result<(), AppError> {
        match self {
            SummaryFlow::Result { audio, .. } => {
                *audio = Some(bytes);
                Ok(())
            }
            _ => Err(self.invalid("store audio")),
        }
    }

    /// The cached audio for download. Errors until speech has been synthesized
    /// for the current summary text.
    pub fn audio(&self) -> Result<&Bytes, AppError> {
        match self {
            SummaryFlow::Result {
                audio: Some(bytes), ..
            } => Ok(bytes),
            _ => Err(AppError::Conflict("Please play the audio first!".to_string())),
        }
    }

    pub fn state(&self) -> SummaryState {
        let (gender, language, last_error) = match self {
            SummaryFlow::SelectGender => (None, None, None),
            SummaryFlow::SelectLanguage { gender } => (Some(*gender), None, None),
            SummaryFlow::ReadyToGenerate {
                gender,
                language,
                last_error,
            } => (Some(*gender), Some(*language), last_error.clone()),
            SummaryFlow::Generating { gender, language }
            | SummaryFlow::Result {
                gender, language, ..
            } => (Some(*gender), Some(*language), None),
        };
        SummaryState {
            step: self.step(),
            gender,
            language,
            summary_text: self.summary_text().map(str::to_string),
            has_audio: matches!(self, SummaryFlow::Result { audio: Some(_), .. }),
            last_error,
        }
    }

    fn invalid(&self, action: &str) -> AppError {
        AppError::Conflict(format!("Cannot {action} while {}", self.step()))
    }
}
