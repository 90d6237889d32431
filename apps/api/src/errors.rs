use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Every variant renders as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    UnreadableDocument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Send {remaining} more messages to unlock the Summary Room!")]
    SummaryLocked { remaining: u32 },

    #[error("{0}")]
    Conflict(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    UpstreamGeneration(String),

    #[error("Failed to generate speech")]
    UpstreamSpeech { detail: String },

    #[error("{message}")]
    UpstreamSearch { message: String, detail: String },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::UnreadableDocument(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SummaryLocked { .. } => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::UpstreamGeneration(_)
            | AppError::UpstreamSpeech { .. }
            | AppError::UpstreamSearch { .. }
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::SummaryLocked { remaining } => json!({
                "error": self.to_string(),
                "remaining": remaining,
            }),
            AppError::UpstreamGeneration(msg) => {
                tracing::error!("Generation error: {msg}");
                json!({ "error": msg })
            }
            AppError::UpstreamSpeech { detail } => {
                tracing::error!("TTS error: {detail}");
                json!({ "error": self.to_string(), "detail": detail })
            }
            AppError::UpstreamSearch { message, detail } => {
                tracing::error!("Search error: {detail}");
                json!({ "error": message })
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                json!({ "error": "An internal server error occurred" })
            }
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        tracing::warn!("Multipart rejected: {}", rejection.body_text());
        AppError::BadRequest("File upload failed".to_string())
    }
}
