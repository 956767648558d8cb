use crate::api::error::AppError;
use crate::services::ingestion::UploadMeta;
use crate::services::media::RemoteAssetResult;
use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use futures::TryStreamExt;
use serde::Serialize;
use tokio_util::io::StreamReader;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub data: RemoteAssetResult,
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = Multipart, description = "Product image upload, field `image`, max 10 MiB"),
    responses(
        (status = 200, description = "Image stored remotely", body = UploadResponse),
        (status = 400, description = "Missing or invalid image field"),
        (status = 413, description = "Payload exceeds size ceiling"),
        (status = 500, description = "Scratch IO or remote service failure")
    ),
    tag = "upload"
)]
pub async fn upload_image(
    State(state): State<crate::AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    // Capture errors in a result so the remaining multipart stream can be
    // consumed before replying (an early close makes browsers report a
    // network error instead of our envelope).
    let result: Result<Json<UploadResponse>, AppError> = async {
        let mut asset: Option<RemoteAssetResult> = None;
        while let Some(field) = multipart.next_field().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge(format!(
                    "업로드 가능한 최대 파일 크기는 {}MB입니다.",
                    state.config.max_upload_size / (1024 * 1024)
                ))
            } else {
                AppError::BadRequest(e.to_string())
            }
        })? {
            let name = field.name().unwrap_or_default().to_string();

            if name == "image" {
                let meta = UploadMeta {
                    filename: field.file_name().unwrap_or("unnamed").to_string(),
                    declared_type: field.content_type().map(|s| s.to_string()),
                };

                let body_with_io_error = field.map_err(std::io::Error::other);
                let reader = StreamReader::new(body_with_io_error);

                asset = Some(state.ingestion.ingest(&meta, reader).await?);
            } else {
                // Unknown fields are drained and ignored
                let _ = field.text().await;
            }
        }

        let asset = asset.ok_or(AppError::Validation(
            "이미지 파일이 필요합니다.".to_string(),
        ))?;

        Ok(Json(UploadResponse {
            success: true,
            message: "이미지가 성공적으로 업로드되었습니다.".to_string(),
            data: asset,
        }))
    }
    .await;

    match result {
        Ok(res) => Ok(res),
        Err(e) => {
            tracing::warn!("Upload failed: {}. Consuming remaining stream...", e);
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            Err(e)
        }
    }
}

/// Pre-flight negotiation: empty 200, CORS headers come from the layer.
pub async fn preflight() -> impl IntoResponse {
    StatusCode::OK
}

/// Any method other than POST/OPTIONS on /upload
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
