//! Request extractors that report failures in the `{ "error": ... }` shape.

use axum::extract::{FromRequest, Multipart};
use bytes::Bytes;

use crate::errors::AppError;

/// `axum::Json` whose rejection becomes `AppError::BadRequest`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Multipart field carrying the uploaded PDF.
pub const RESUME_FIELD: &str = "resume";

/// Reads the `resume` field of an upload. Other fields are ignored.
pub async fn read_resume_upload(mut multipart: Multipart, max_bytes: usize) -> Result<Bytes, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(upload_failed)? {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(upload_failed)?;
        if bytes.len() > max_bytes {
            return Err(AppError::BadRequest(format!(
                "File too large; the limit is {} MB",
                max_bytes / (1024 * 1024)
            )));
        }
        tracing::info!(
            "File uploaded: {} ({} bytes)",
            file_name.as_deref().unwrap_or("<unnamed>"),
            bytes.len()
        );
        return Ok(bytes);
    }
    Err(AppError::BadRequest("No file uploaded".to_string()))
}

fn upload_failed(err: axum::extract::multipart::MultipartError) -> AppError {
    tracing::warn!("Multipart read failed: {err}");
    AppError::BadRequest("File upload failed".to_string())
}
