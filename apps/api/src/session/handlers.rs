//! Axum route handlers for server-side sessions.
//!
//! Every handler locks its session for the whole action. State is only written
//! after the upstream call succeeded; the one exception is summary generation,
//! whose failure is recorded on the wizard.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::advice::handlers::{analyze_resume, run_chat};
use crate::advice::prompts::{
    build_absolution_prompt, build_elaborate_prompt, build_summary_prompt, clip_chars,
    render_chat_context, render_confession_context, section_prompt, ChatPrompt,
    CHAT_HISTORY_WINDOW, MAX_TURN_CHARS,
};
use crate::advice::skills::{extract_skills, MAX_SELECTED_SKILLS};
use crate::errors::AppError;
use crate::extract::extract_resume;
use crate::routes::extractors::{read_resume_upload, AppJson};
use crate::session::context::{Confession, SectionKey};
use crate::session::summary_flow::{Gender, Language, SummaryFlow, SummaryState};
use crate::session::unlock::UnlockStatus;
use crate::session::{Session, SessionSnapshot, SharedSession};
use crate::speech::{synthesize_speech, AUDIO_MIME};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreatedResponse {
    pub success: bool,
    pub session_id: Uuid,
    pub analysis: String,
    pub resume_text: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct SectionResponse {
    pub success: bool,
    pub section: SectionKey,
    pub response: String,
    pub cached: bool,
}

#[derive(Debug, Deserialize)]
pub struct ElaborateRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AdviceResponse {
    pub success: bool,
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SessionChatResponse {
    pub success: bool,
    pub response: String,
    pub unlock: UnlockStatus,
}

#[derive(Debug, Deserialize)]
pub struct ConfessionRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ConfessionResponse {
    pub success: bool,
    pub confession: Confession,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillsResponse {
    pub success: bool,
    pub skills: Vec<String>,
    pub max_selected: usize,
}

#[derive(Debug, Deserialize)]
pub struct GenderRequest {
    pub gender: String,
}

#[derive(Debug, Deserialize)]
pub struct LanguageRequest {
    pub language: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryStateResponse {
    pub success: bool,
    pub state: SummaryState,
}

#[derive(Debug, Serialize)]
pub struct SummaryGeneratedResponse {
    pub success: bool,
    pub summary: String,
    pub state: SummaryState,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Malformed ids are reported like unknown ones.
fn parse_session_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("Session {raw} not found")))
}

async fn load_session(state: &AppState, raw_id: &str) -> Result<SharedSession, AppError> {
    let id = parse_session_id(raw_id)?;
    state.sessions.get(id).await
}

fn audio_response(audio: Bytes) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, AUDIO_MIME)], audio)
}

// ────────────────────────────────────────────────────────────────────────────
// Lifecycle
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/sessions
pub async fn create_session(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<SessionCreatedResponse>), AppError> {
    let file = read_resume_upload(multipart?, state.config.max_upload_bytes).await?;
    let resume = extract_resume(state.extractor.as_ref(), file).await?;
    let analysis = analyze_resume(&state, &resume).await?;

    let resume_text = resume.raw_text().to_string();
    let (session_id, _) = state
        .sessions
        .insert(Session::new(resume, analysis.clone()))
        .await;
    let active = state.sessions.len().await;
    info!("Created session {session_id} ({active} active)");

    Ok((
        StatusCode::CREATED,
        Json(SessionCreatedResponse {
            success: true,
            session_id,
            analysis,
            resume_text,
        }),
    ))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = load_session(&state, &id).await?;
    let session = session.lock().await;
    Ok(Json(session.snapshot()))
}

/// DELETE /api/sessions/:id
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    let id = parse_session_id(&id)?;
    if !state.sessions.remove(id).await {
        return Err(AppError::NotFound(format!("Session {id} not found")));
    }
    info!("Deleted session {id}");
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/sessions/:id/resume
///
/// Starts over with a new PDF. The old resume and everything derived from it
/// survive if the upload, extraction or analysis fails.
pub async fn replace_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SessionCreatedResponse>, AppError> {
    let session = load_session(&state, &id).await?;
    let mut session = session.lock().await;

    let file = read_resume_upload(multipart?, state.config.max_upload_bytes).await?;
    let resume = extract_resume(state.extractor.as_ref(), file).await?;
    let analysis = analyze_resume(&state, &resume).await?;

    let resume_text = resume.raw_text().to_string();
    session.replace_resume(resume, analysis.clone());
    info!("Session {} started over with a new resume", session.id);

    Ok(Json(SessionCreatedResponse {
        success: true,
        session_id: session.id,
        analysis,
        resume_text,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Sections and chat
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/sessions/:id/sections/:section
///
/// Each section is generated once per resume; later calls replay the cache.
pub async fn load_section(
    State(state): State<AppState>,
    Path((id, section)): Path<(String, String)>,
) -> Result<Json<SectionResponse>, AppError> {
    let key: SectionKey = section.parse()?;
    let session = load_session(&state, &id).await?;
    let mut session = session.lock().await;

    if let Some(text) = session.context.cached(key) {
        return Ok(Json(SectionResponse {
            success: true,
            section: key,
            response: text.to_string(),
            cached: true,
        }));
    }

    let response = run_chat(
        &state,
        ChatPrompt {
            resume_text: &session.analysis,
            user_prompt: section_prompt(key),
            elaborate: false,
            history: &[],
            confessions: &[],
        },
    )
    .await?;
    let response = session.context.cache_section(key, response).to_string();

    Ok(Json(SectionResponse {
        success: true,
        section: key,
        response,
        cached: false,
    }))
}

/// POST /api/sessions/:id/elaborate
pub async fn elaborate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(request): AppJson<ElaborateRequest>,
) -> Result<Json<AdviceResponse>, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::BadRequest("No text provided".to_string()));
    }
    let session = load_session(&state, &id).await?;
    let session = session.lock().await;

    let prompt = build_elaborate_prompt(&request.text);
    let response = run_chat(
        &state,
        ChatPrompt {
            resume_text: &session.analysis,
            user_prompt: &prompt,
            elaborate: true,
            history: &[],
            confessions: &[],
        },
    )
    .await?;

    Ok(Json(AdviceResponse {
        success: true,
        response,
    }))
}

/// POST /api/sessions/:id/chat
///
/// Free-form chat. Only a completed exchange is recorded and counted toward
/// the Summary Room unlock.
pub async fn chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(request): AppJson<SessionChatRequest>,
) -> Result<Json<SessionChatResponse>, AppError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("No message provided".to_string()));
    }
    if message.chars().count() > MAX_TURN_CHARS {
        return Err(AppError::BadRequest(format!(
            "Message is too long; keep it under {MAX_TURN_CHARS} characters"
        )));
    }
    let session = load_session(&state, &id).await?;
    let mut session = session.lock().await;

    let confessions = session.context.confession_texts();
    let response = run_chat(
        &state,
        ChatPrompt {
            resume_text: session.resume.raw_text(),
            user_prompt: message,
            elaborate: false,
            history: session.context.recent_history(CHAT_HISTORY_WINDOW),
            confessions: &confessions,
        },
    )
    .await?;

    if session.context.record_exchange(message, response.clone()) {
        info!("Session {} unlocked the Summary Room", session.id);
    }

    Ok(Json(SessionChatResponse {
        success: true,
        response,
        unlock: session.context.gate().status(),
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Confessions
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/sessions/:id/confessions
pub async fn add_confession(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(request): AppJson<ConfessionRequest>,
) -> Result<(StatusCode, Json<ConfessionResponse>), AppError> {
    let session = load_session(&state, &id).await?;
    let mut session = session.lock().await;
    let confession = session.context.add_confession(&request.text)?;
    Ok((
        StatusCode::CREATED,
        Json(ConfessionResponse {
            success: true,
            confession,
        }),
    ))
}

/// DELETE /api/sessions/:id/confessions/:confession_id
pub async fn remove_confession(
    State(state): State<AppState>,
    Path((id, confession_id)): Path<(String, String)>,
) -> Result<Json<SuccessResponse>, AppError> {
    let session = load_session(&state, &id).await?;
    let mut session = session.lock().await;

    let removed = Uuid::parse_str(&confession_id)
        .map(|cid| session.context.remove_confession(cid))
        .unwrap_or(false);
    if !removed {
        return Err(AppError::NotFound(format!(
            "Confession {confession_id} not found"
        )));
    }
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/sessions/:id/absolution
pub async fn absolution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AdviceResponse>, AppError> {
    let session = load_session(&state, &id).await?;
    let session = session.lock().await;

    let confessions = session.context.confession_texts();
    if confessions.is_empty() {
        return Err(AppError::BadRequest(
            "You must confess something first!".to_string(),
        ));
    }

    let prompt = build_absolution_prompt(&confessions);
    let response = run_chat(
        &state,
        ChatPrompt {
            resume_text: session.resume.raw_text(),
            user_prompt: &prompt,
            elaborate: true,
            history: &[],
            confessions: &confessions,
        },
    )
    .await?;

    Ok(Json(AdviceResponse {
        success: true,
        response,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Learning Crypt
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/sessions/:id/skills
///
/// Skill tags to pick from before asking `/api/resources`.
pub async fn list_skills(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SkillsResponse>, AppError> {
    let session = load_session(&state, &id).await?;
    let session = session.lock().await;
    let skills = extract_skills(&session.analysis, session.resume.raw_text());
    Ok(Json(SkillsResponse {
        success: true,
        skills,
        max_selected: MAX_SELECTED_SKILLS,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Summary Room
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/sessions/:id/summary
///
/// Opens (or reopens) the wizard with everything unset.
pub async fn start_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SummaryStateResponse>, AppError> {
    let session = load_session(&state, &id).await?;
    let mut session = session.lock().await;
    session.context.gate().ensure_unlocked()?;

    let flow = session.summary.insert(SummaryFlow::start());
    Ok(Json(SummaryStateResponse {
        success: true,
        state: flow.state(),
    }))
}

/// POST /api/sessions/:id/summary/gender
pub async fn select_gender(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(request): AppJson<GenderRequest>,
) -> Result<Json<SummaryStateResponse>, AppError> {
    let gender: Gender = request.gender.parse()?;
    let session = load_session(&state, &id).await?;
    let mut session = session.lock().await;

    let flow = session.summary_mut()?;
    flow.select_gender(gender)?;
    Ok(Json(SummaryStateResponse {
        success: true,
        state: flow.state(),
    }))
}

/// POST /api/sessions/:id/summary/language
pub async fn select_language(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(request): AppJson<LanguageRequest>,
) -> Result<Json<SummaryStateResponse>, AppError> {
    let language: Language = request.language.parse()?;
    let session = load_session(&state, &id).await?;
    let mut session = session.lock().await;

    let flow = session.summary_mut()?;
    flow.select_language(language)?;
    Ok(Json(SummaryStateResponse {
        success: true,
        state: flow.state(),
    }))
}

/// POST /api/sessions/:id/summary/generate
///
/// Generates or regenerates the introduction. The work runs on its own task so
/// a dropped connection cannot strand the wizard in `Generating`.
pub async fn generate_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SummaryGeneratedResponse>, AppError> {
    let session = load_session(&state, &id).await?;
    tokio::spawn(run_summary_generation(state, session))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Summary task failed: {e}")))?
        .map(Json)
}

async fn run_summary_generation(
    state: AppState,
    session: SharedSession,
) -> Result<SummaryGeneratedResponse, AppError> {
    let mut session = session.lock().await;
    let (gender, language) = session.summary_mut()?.begin_generation()?;

    let chat_context = render_chat_context(session.context.history());
    let confession_context = render_confession_context(&session.context.confession_texts());
    let prompt = build_summary_prompt(
        clip_chars(session.resume.raw_text(), state.config.max_resume_chars),
        gender.pronouns(),
        language.prompt_name(),
        Some(chat_context.as_str()),
        Some(confession_context.as_str()),
    );

    info!(
        "Generating {} summary for session {}",
        language.prompt_name(),
        session.id
    );
    let outcome = state.llm.generate(&prompt).await.map_err(AppError::from);

    let flow = session.summary_mut()?;
    match outcome {
        Ok(summary) => {
            flow.finish_generation(Ok(summary.clone()))?;
            Ok(SummaryGeneratedResponse {
                success: true,
                summary,
                state: flow.state(),
            })
        }
        Err(err) => {
            warn!("Summary generation failed: {err}");
            flow.finish_generation(Err(err.to_string()))?;
            Err(err)
        }
    }
}

/// POST /api/sessions/:id/summary/audio
///
/// Speaks the current summary and keeps the audio for download.
pub async fn synthesize_summary_audio(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = load_session(&state, &id).await?;
    let mut session = session.lock().await;

    let flow = session.summary_mut()?;
    let text = flow
        .summary_text()
        .ok_or_else(|| AppError::Conflict("Generate a summary first".to_string()))?
        .to_string();

    let audio = synthesize_speech(state.speech.as_ref(), &text).await?;
    flow.attach_audio(audio.clone())?;
    Ok(audio_response(audio))
}

/// GET /api/sessions/:id/summary/audio
pub async fn download_summary_audio(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = load_session(&state, &id).await?;
    let session = session.lock().await;

    let audio = session
        .summary
        .as_ref()
        .ok_or_else(|| AppError::Conflict("Please play the audio first!".to_string()))?
        .audio()?
        .clone();
    Ok((
        [
            (header::CONTENT_TYPE, AUDIO_MIME),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"professor-doom-summary.mp3\"",
            ),
        ],
        audio,
    ))
}
