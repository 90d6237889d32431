pub mod extractors;
pub mod health;

#[cfg(test)]
mod tests;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, MethodRouter},
    Router,
};

use crate::advice::handlers as advice;
use crate::errors::AppError;
use crate::session::handlers as sessions;
use crate::state::AppState;

/// Multipart framing around the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Unsupported methods get the JSON error body instead of axum's empty 405.
fn json_405(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.fallback(method_not_allowed)
}

pub fn build_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(health::health_handler))
        // Stateless API: the client sends all context with each call
        .route(
            "/api/analyze",
            json_405(post(advice::handle_analyze).layer(upload_limit)),
        )
        .route("/api/chat", json_405(post(advice::handle_chat)))
        .route("/api/summary", json_405(post(advice::handle_summary)))
        .route("/api/resources", json_405(post(advice::handle_resources)))
        .route("/api/trends", json_405(post(advice::handle_trends)))
        .route("/api/speak", json_405(post(advice::handle_speak)))
        // Session API
        .route(
            "/api/sessions",
            json_405(post(sessions::create_session).layer(upload_limit)),
        )
        .route(
            "/api/sessions/:id",
            json_405(get(sessions::get_session).delete(sessions::delete_session)),
        )
        .route(
            "/api/sessions/:id/resume",
            json_405(post(sessions::replace_resume).layer(upload_limit)),
        )
        .route(
            "/api/sessions/:id/sections/:section",
            json_405(post(sessions::load_section)),
        )
        .route(
            "/api/sessions/:id/elaborate",
            json_405(post(sessions::elaborate)),
        )
        .route("/api/sessions/:id/chat", json_405(post(sessions::chat)))
        .route(
            "/api/sessions/:id/confessions",
            json_405(post(sessions::add_confession)),
        )
        .route(
            "/api/sessions/:id/confessions/:confession_id",
            json_405(delete(sessions::remove_confession)),
        )
        .route(
            "/api/sessions/:id/absolution",
            json_405(post(sessions::absolution)),
        )
        .route(
            "/api/sessions/:id/skills",
            json_405(get(sessions::list_skills)),
        )
        .route(
            "/api/sessions/:id/summary",
            json_405(post(sessions::start_summary)),
        )
        .route(
            "/api/sessions/:id/summary/gender",
            json_405(post(sessions::select_gender)),
        )
        .route(
            "/api/sessions/:id/summary/language",
            json_405(post(sessions::select_language)),
        )
        .route(
            "/api/sessions/:id/summary/generate",
            json_405(post(sessions::generate_summary)),
        )
        .route(
            "/api/sessions/:id/summary/audio",
            json_405(
                post(sessions::synthesize_summary_audio).get(sessions::download_summary_audio),
            ),
        )
        .with_state(state)
}
