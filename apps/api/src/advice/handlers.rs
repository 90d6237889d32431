//! Axum route handlers for the stateless Professor Doom API.
//!
//! The client sends all context (resume text, history, confessions) with each call.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::advice::prompts::{
    build_analysis_prompt, build_chat_prompt, build_summary_prompt, clip_chars, ChatPrompt,
};
use crate::advice::skills::MAX_SELECTED_SKILLS;
use crate::errors::AppError;
use crate::extract::{extract_resume, ResumeDocument};
use crate::routes::extractors::{read_resume_upload, AppJson};
use crate::search::{SearchQuery, SearchResult};
use crate::session::context::ChatTurn;
use crate::session::summary_flow::{Gender, Language};
use crate::speech::{synthesize_speech, AUDIO_MIME};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub analysis: String,
    pub resume_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub resume_text: String,
    pub prompt: String,
    #[serde(default)]
    pub elaborate: Option<bool>,
    #[serde(default)]
    pub history: Option<Vec<ChatTurn>>,
    #[serde(default)]
    pub confessions: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub resume_text: String,
    pub gender: String,
    pub language: String,
    #[serde(default)]
    pub chat_context: Option<String>,
    #[serde(default)]
    pub confession_context: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    pub summary: String,
}

#[derive(Debug, Deserialize)]
pub struct ResourcesRequest {
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ResourcesResponse {
    pub success: bool,
    pub resources: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub struct TrendsRequest {
    #[serde(default)]
    pub industry: String,
}

#[derive(Debug, Serialize)]
pub struct TrendsResponse {
    pub success: bool,
    pub trends: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    #[serde(default)]
    pub text: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Shared steps
// ────────────────────────────────────────────────────────────────────────────

/// Runs the opening analysis of a freshly extracted resume.
pub async fn analyze_resume(state: &AppState, resume: &ResumeDocument) -> Result<String, AppError> {
    let resume_text = clip_chars(resume.raw_text(), state.config.max_resume_chars);
    let prompt = build_analysis_prompt(resume_text);
    info!("Calling {} for resume analysis", state.llm.model());
    let analysis = state.llm.generate(&prompt).await?;
    info!("Analysis received ({} chars)", analysis.len());
    Ok(analysis)
}

/// Sends a chat prompt built from `input` and returns the reply.
pub async fn run_chat(state: &AppState, input: ChatPrompt<'_>) -> Result<String, AppError> {
    let input = ChatPrompt {
        resume_text: clip_chars(input.resume_text, state.config.max_resume_chars),
        ..input
    };
    let prompt = build_chat_prompt(&input);
    Ok(state.llm.generate(&prompt).await?)
}

/// Gender token (`female`) or a literal pronoun set (`she/her/her`).
fn resolve_pronouns(raw: &str) -> Result<String, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::BadRequest("No gender provided".to_string()));
    }
    Ok(raw
        .parse::<Gender>()
        .map(|g| g.pronouns().to_string())
        .unwrap_or_else(|_| raw.to_string()))
}

/// Language token (`hindi`) or a literal language name.
fn resolve_language(raw: &str) -> Result<String, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::BadRequest("No language provided".to_string()));
    }
    Ok(raw
        .parse::<Language>()
        .map(|l| l.prompt_name().to_string())
        .unwrap_or_else(|_| raw.to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/analyze
///
/// Multipart upload (`resume` field). Extracts the PDF text and returns the opening analysis.
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let file = read_resume_upload(multipart?, state.config.max_upload_bytes).await?;
    let resume = extract_resume(state.extractor.as_ref(), file).await?;
    let analysis = analyze_resume(&state, &resume).await?;

    Ok(Json(AnalyzeResponse {
        success: true,
        analysis,
        resume_text: resume.raw_text().to_string(),
    }))
}

/// POST /api/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    AppJson(request): AppJson<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if request.prompt.trim().is_empty() {
        return Err(AppError::BadRequest("No prompt provided".to_string()));
    }
    let history = request.history.unwrap_or_default();
    let confessions = request.confessions.unwrap_or_default();

    let response = run_chat(
        &state,
        ChatPrompt {
            resume_text: &request.resume_text,
            user_prompt: &request.prompt,
            elaborate: request.elaborate.unwrap_or(false),
            history: &history,
            confessions: &confessions,
        },
    )
    .await?;

    Ok(Json(ChatResponse {
        success: true,
        response,
    }))
}

/// POST /api/summary
///
/// Positive spoken introduction in the requested language.
pub async fn handle_summary(
    State(state): State<AppState>,
    AppJson(request): AppJson<SummaryRequest>,
) -> Result<Json<SummaryResponse>, AppError> {
    let pronouns = resolve_pronouns(&request.gender)?;
    let language = resolve_language(&request.language)?;

    let prompt = build_summary_prompt(
        clip_chars(&request.resume_text, state.config.max_resume_chars),
        &pronouns,
        &language,
        request.chat_context.as_deref(),
        request.confession_context.as_deref(),
    );
    let summary = state.llm.generate(&prompt).await?;

    Ok(Json(SummaryResponse {
        success: true,
        summary,
    }))
}

/// POST /api/resources
///
/// Learning resources for at most `MAX_SELECTED_SKILLS` skills.
pub async fn handle_resources(
    State(state): State<AppState>,
    AppJson(request): AppJson<ResourcesRequest>,
) -> Result<Json<ResourcesResponse>, AppError> {
    let skills: Vec<String> = request
        .skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if skills.is_empty() {
        return Err(AppError::BadRequest("No skills provided".to_string()));
    }
    if skills.len() > MAX_SELECTED_SKILLS {
        return Err(AppError::BadRequest(format!(
            "Maximum {MAX_SELECTED_SKILLS} skills can be selected"
        )));
    }

    let resources = state
        .search
        .search(&SearchQuery::learning_resources(&skills))
        .await
        .map_err(|e| AppError::UpstreamSearch {
            message: "Failed to find resources".to_string(),
            detail: e.to_string(),
        })?;

    Ok(Json(ResourcesResponse {
        success: true,
        resources,
    }))
}

/// POST /api/trends
pub async fn handle_trends(
    State(state): State<AppState>,
    AppJson(request): AppJson<TrendsRequest>,
) -> Result<Json<TrendsResponse>, AppError> {
    let industry = request.industry.trim();
    if industry.is_empty() {
        return Err(AppError::BadRequest("No industry provided".to_string()));
    }

    let trends = state
        .search
        .search(&SearchQuery::skill_trends(industry, Utc::now().year()))
        .await
        .map_err(|e| AppError::UpstreamSearch {
            message: "Failed to find trends".to_string(),
            detail: e.to_string(),
        })?;

    Ok(Json(TrendsResponse {
        success: true,
        trends,
    }))
}

/// POST /api/speak
///
/// Returns raw MP3 bytes.
pub async fn handle_speak(
    State(state): State<AppState>,
    AppJson(request): AppJson<SpeakRequest>,
) -> Result<impl IntoResponse, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::BadRequest("No text provided".to_string()));
    }
    let audio = synthesize_speech(state.speech.as_ref(), &request.text).await?;
    Ok(([(header::CONTENT_TYPE, AUDIO_MIME)], audio))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_token_maps_to_pronouns() {
        assert_eq!(resolve_pronouns("female").unwrap(), "she/her/her");
        assert_eq!(resolve_pronouns("Other").unwrap(), "they/them/their");
    }

    #[test]
    fn test_literal_pronouns_pass_through() {
        assert_eq!(resolve_pronouns("xe/xem/xyr").unwrap(), "xe/xem/xyr");
        assert!(resolve_pronouns("  ").is_err());
    }

    #[test]
    fn test_language_token_maps_to_prompt_name() {
        assert_eq!(resolve_language("hindi").unwrap(), "Hindi (Hinglish is fine)");
        assert_eq!(resolve_language("Portuguese").unwrap(), "Portuguese");
        assert!(resolve_language("").is_err());
    }

    #[test]
    fn test_chat_request_optional_fields_accept_null() {
        let json = r#"{"resumeText": "r", "prompt": "p", "elaborate": null, "history": null}"#;
        let req: ChatRequest = serde_json::from_str(json).unwrap();
        assert!(req.elaborate.is_none());
        assert!(req.history.is_none());
        assert!(req.confessions.is_none());
    }

    #[test]
    fn test_analyze_response_uses_camel_case() {
        let json = serde_json::to_value(AnalyzeResponse {
            success: true,
            analysis: "a".into(),
            resume_text: "r".into(),
        })
        .unwrap();
        assert_eq!(json["resumeText"], "r");
        assert_eq!(json["success"], true);
    }
}
