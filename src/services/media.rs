use crate::config::{MediaCredentials, UploadConfig};
use crate::services::encoder::EncodedPayload;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Instructions for the remote service: where to store the asset, under
/// which identifier, and how to normalize it.
#[derive(Debug, Clone)]
pub struct TransformDirective {
    pub folder: String,
    /// Request-unique asset identifier
    pub public_id: String,
    /// e.g. "f_auto,q_auto:good"
    pub transformation: String,
}

impl TransformDirective {
    /// Build a directive with a fresh identifier.
    ///
    /// The identifier keeps the millisecond timestamp prefix for human
    /// readability but appends a UUID so concurrent requests (or requests
    /// within the same millisecond) can never overwrite each other.
    pub fn fresh(config: &UploadConfig) -> Self {
        let public_id = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        Self {
            folder: config.asset_folder.clone(),
            public_id,
            transformation: format!("f_{},q_{}", config.fetch_format, config.quality),
        }
    }
}

/// Canonical result returned by the remote media service once the asset
/// is stored and normalized. Immutable; a subset goes into the response
/// envelope verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RemoteAssetResult {
    pub public_id: String,
    pub secure_url: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub bytes: u64,
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("remote service rejected the upload (HTTP {status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("remote submission timed out")]
    Timeout,

    #[error("transport error reaching remote service: {0}")]
    Transport(reqwest::Error),

    #[error("malformed response from remote service: {0}")]
    MalformedResponse(String),
}

/// Narrow capability interface to the remote media-processing service.
/// The pipeline only ever talks to this trait, so the concrete HTTP API
/// stays swappable (and mockable in tests).
#[async_trait]
pub trait MediaBackend: Send + Sync {
    async fn submit(
        &self,
        payload: &EncodedPayload,
        directive: &TransformDirective,
    ) -> Result<RemoteAssetResult, MediaError>;
}

/// Cloudinary-style signed upload API over HTTPS.
pub struct CloudinaryBackend {
    client: reqwest::Client,
    credentials: MediaCredentials,
}

impl CloudinaryBackend {
    pub fn new(credentials: MediaCredentials, timeout: Duration) -> anyhow::Result<Self> {
        anyhow::ensure!(
            credentials.is_configured(),
            "media service credentials missing (CLOUDINARY_CLOUD_NAME / CLOUDINARY_API_KEY / CLOUDINARY_API_SECRET)"
        );
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            credentials,
        })
    }

    fn upload_url(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.credentials.cloud_name
        )
    }
}

/// Request signature: SHA-256 over the signed parameters sorted by key
/// and joined with '&', with the API secret appended.
fn sign_request(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);
    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Pull a human-readable message out of an error reply, which is usually
/// `{"error": {"message": "..."}}` but not guaranteed to be JSON at all.
fn extract_error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl MediaBackend for CloudinaryBackend {
    async fn submit(
        &self,
        payload: &EncodedPayload,
        directive: &TransformDirective,
    ) -> Result<RemoteAssetResult, MediaError> {
        let timestamp = Utc::now().timestamp().to_string();

        let signed_params = [
            ("folder", directive.folder.as_str()),
            ("public_id", directive.public_id.as_str()),
            ("timestamp", timestamp.as_str()),
            ("transformation", directive.transformation.as_str()),
        ];
        let signature = sign_request(&signed_params, &self.credentials.api_secret);

        let form = [
            ("file", payload.data_uri.as_str()),
            ("folder", directive.folder.as_str()),
            ("public_id", directive.public_id.as_str()),
            ("timestamp", timestamp.as_str()),
            ("transformation", directive.transformation.as_str()),
            ("api_key", self.credentials.api_key.as_str()),
            ("signature", signature.as_str()),
            ("signature_algorithm", "sha256"),
        ];

        let response = self
            .client
            .post(self.upload_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MediaError::Timeout
                } else {
                    MediaError::Transport(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Rejected {
                status: status.as_u16(),
                detail: extract_error_detail(&body),
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                MediaError::Timeout
            } else {
                MediaError::Transport(e)
            }
        })?;
        serde_json::from_str::<RemoteAssetResult>(&body)
            .map_err(|e| MediaError::MalformedResponse(e.to_string()))
    }
}
