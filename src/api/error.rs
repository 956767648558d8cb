use crate::services::media::MediaError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failure taxonomy for the ingestion pipeline. Every variant maps to
/// exactly one HTTP status and one failure envelope.
#[derive(Error, Debug)]
pub enum AppError {
    /// User-correctable request problem (missing field, unsupported type)
    #[error("{0}")]
    Validation(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    /// Local fault reading or writing the scratch file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Upstream media service rejection, timeout or malformed reply
    #[error("Remote service error: {0}")]
    Remote(#[from] MediaError),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg, None),
            AppError::Io(e) => {
                tracing::error!("Scratch file IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "이미지 업로드에 실패했습니다.".to_string(),
                    Some(e.to_string()),
                )
            }
            AppError::Remote(e) => {
                tracing::error!("Remote submission error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "이미지 업로드에 실패했습니다.".to_string(),
                    Some(e.to_string()),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed".to_string(),
                None,
            ),
        };

        let body = match details {
            Some(details) => Json(json!({
                "success": false,
                "error": error,
                "details": details,
            })),
            None => Json(json!({
                "success": false,
                "error": error,
            })),
        };

        (status, body).into_response()
    }
}
