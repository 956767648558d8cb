use crate::api::error::AppError;
use crate::config::UploadConfig;
use crate::services::encoder::encode_data_uri;
use crate::services::media::{MediaBackend, RemoteAssetResult, TransformDirective};
use crate::services::scratch::ScratchFile;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

/// How many leading bytes to keep for magic-byte sniffing
const HEADER_PEEK: usize = 1024;

/// Client-declared attributes of the uploaded file
#[derive(Debug, Clone)]
pub struct UploadMeta {
    pub filename: String,
    pub declared_type: Option<String>,
}

struct ReceivedFile {
    bytes: u64,
    header: Vec<u8>,
}

/// Drives one upload through the pipeline:
/// receive → encode → submit, with unconditional scratch cleanup.
pub struct IngestionService {
    config: UploadConfig,
    backend: Arc<dyn MediaBackend>,
}

impl IngestionService {
    pub fn new(config: UploadConfig, backend: Arc<dyn MediaBackend>) -> Self {
        Self { config, backend }
    }

    /// Ingest one uploaded file and return the stored asset.
    ///
    /// The scratch file is removed on every exit path, success or failure,
    /// before the result is returned.
    pub async fn ingest<R>(&self, meta: &UploadMeta, reader: R) -> Result<RemoteAssetResult, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let scratch = ScratchFile::create(&self.config.scratch_dir, &meta.filename).await?;
        let outcome = self.run(&scratch, meta, reader).await;
        scratch.cleanup().await;
        outcome
    }

    async fn run<R>(
        &self,
        scratch: &ScratchFile,
        meta: &UploadMeta,
        reader: R,
    ) -> Result<RemoteAssetResult, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        // Receive
        let received = self.receive_into(scratch.path(), reader).await?;
        let media_type = resolve_media_type(meta.declared_type.as_deref(), &received.header)?;
        tracing::info!(
            filename = %meta.filename,
            media_type = %media_type,
            bytes = received.bytes,
            "📥 Upload received into scratch file"
        );

        // Encode
        let payload = encode_data_uri(&media_type, scratch.path()).await?;
        tracing::debug!(bytes = payload.byte_len, "Payload encoded for submission");

        // Submit
        let directive = TransformDirective::fresh(&self.config);
        let asset = self.backend.submit(&payload, &directive).await?;
        tracing::info!(
            public_id = %asset.public_id,
            format = %asset.format,
            bytes = asset.bytes,
            "✅ Remote submission complete"
        );

        Ok(asset)
    }

    /// Stream the upload into the scratch file, enforcing the size ceiling
    /// as bytes arrive rather than after buffering the whole body.
    async fn receive_into<R>(&self, path: &Path, mut reader: R) -> Result<ReceivedFile, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let ceiling = self.config.max_upload_size as u64;
        let mut out = tokio::fs::File::create(path).await?;
        let mut header = Vec::with_capacity(HEADER_PEEK);
        let mut written: u64 = 0;
        let mut buf = vec![0u8; 64 * 1024];

        loop {
            let n = reader.read(&mut buf).await.map_err(|e| {
                // axum surfaces a tripped body limit as a stream error
                if e.to_string().contains("length limit exceeded") {
                    oversize_error(self.config.max_upload_size)
                } else {
                    AppError::Io(e)
                }
            })?;
            if n == 0 {
                break;
            }

            written += n as u64;
            if written > ceiling {
                tracing::warn!(written, ceiling, "Upload exceeds size ceiling, aborting");
                return Err(oversize_error(self.config.max_upload_size));
            }

            if header.len() < HEADER_PEEK {
                let take = (HEADER_PEEK - header.len()).min(n);
                header.extend_from_slice(&buf[..take]);
            }
            out.write_all(&buf[..n]).await?;
        }
        out.flush().await?;

        Ok(ReceivedFile {
            bytes: written,
            header,
        })
    }
}

fn oversize_error(ceiling: usize) -> AppError {
    AppError::PayloadTooLarge(format!(
        "업로드 가능한 최대 파일 크기는 {}MB입니다.",
        ceiling / (1024 * 1024)
    ))
}

/// Resolve the media type carried through the pipeline: trust a declared
/// image/* content type, otherwise sniff the magic bytes.
fn resolve_media_type(declared: Option<&str>, header: &[u8]) -> Result<String, AppError> {
    if let Some(declared) = declared {
        if let Ok(m) = declared.parse::<mime::Mime>() {
            if m.type_() == mime::IMAGE {
                return Ok(m.essence_str().to_string());
            }
        }
    }
    if let Some(kind) = infer::get(header) {
        if kind.matcher_type() == infer::MatcherType::Image {
            return Ok(kind.mime_type().to_string());
        }
    }
    Err(AppError::Validation(
        "이미지 형식의 파일만 업로드할 수 있습니다.".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::encoder::EncodedPayload;
    use crate::services::media::MediaError;
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::sync::Mutex;

    struct RecordingBackend {
        submissions: Mutex<Vec<(String, String)>>,
    }

    impl RecordingBackend {
        fn new() -> Self {
            Self {
                submissions: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MediaBackend for RecordingBackend {
        async fn submit(
            &self,
            payload: &EncodedPayload,
            directive: &TransformDirective,
        ) -> Result<RemoteAssetResult, MediaError> {
            self.submissions
                .lock()
                .unwrap()
                .push((payload.data_uri.clone(), directive.public_id.clone()));
            Ok(RemoteAssetResult {
                public_id: directive.public_id.clone(),
                secure_url: format!("https://res.example.com/{}.jpg", directive.public_id),
                width: 640,
                height: 480,
                format: "jpg".to_string(),
                bytes: payload.byte_len as u64,
            })
        }
    }

    fn jpeg_bytes(len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        bytes[..4].copy_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0]);
        bytes
    }

    fn service(scratch_dir: &Path, backend: Arc<dyn MediaBackend>) -> IngestionService {
        let config = UploadConfig {
            scratch_dir: scratch_dir.to_path_buf(),
            ..UploadConfig::default()
        };
        IngestionService::new(config, backend)
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_ingest_happy_path_cleans_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(RecordingBackend::new());
        let service = service(dir.path(), backend.clone());

        let meta = UploadMeta {
            filename: "croissant.jpg".to_string(),
            declared_type: Some("image/jpeg".to_string()),
        };
        let data = jpeg_bytes(2048);
        let asset = service.ingest(&meta, Cursor::new(data)).await.unwrap();

        assert_eq!(asset.bytes, 2048);
        assert!(dir_is_empty(dir.path()));
        let submissions = backend.submissions.lock().unwrap();
        assert_eq!(submissions.len(), 1);
        assert!(submissions[0].0.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_ingest_oversize_is_rejected_and_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(RecordingBackend::new());
        let config = UploadConfig {
            scratch_dir: dir.path().to_path_buf(),
            max_upload_size: 1024,
            ..UploadConfig::default()
        };
        let service = IngestionService::new(config, backend.clone());

        let meta = UploadMeta {
            filename: "huge.jpg".to_string(),
            declared_type: Some("image/jpeg".to_string()),
        };
        let err = service
            .ingest(&meta, Cursor::new(jpeg_bytes(4096)))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PayloadTooLarge(_)));
        assert!(dir_is_empty(dir.path()));
        assert!(backend.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_non_image_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(RecordingBackend::new());
        let service = service(dir.path(), backend.clone());

        let meta = UploadMeta {
            filename: "menu.txt".to_string(),
            declared_type: Some("text/plain".to_string()),
        };
        let err = service
            .ingest(&meta, Cursor::new(b"just words".to_vec()))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(dir_is_empty(dir.path()));
        assert!(backend.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_sniffs_type_when_declared_missing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(RecordingBackend::new());
        let service = service(dir.path(), backend.clone());

        let meta = UploadMeta {
            filename: "mystery".to_string(),
            declared_type: None,
        };
        // PNG magic
        let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend_from_slice(&[0u8; 64]);
        service.ingest(&meta, Cursor::new(data)).await.unwrap();

        let submissions = backend.submissions.lock().unwrap();
        assert!(submissions[0].0.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_ingest_remote_failure_still_cleans_scratch() {
        struct FailingBackend;

        #[async_trait]
        impl MediaBackend for FailingBackend {
            async fn submit(
                &self,
                _payload: &EncodedPayload,
                _directive: &TransformDirective,
            ) -> Result<RemoteAssetResult, MediaError> {
                Err(MediaError::Rejected {
                    status: 401,
                    detail: "Invalid API key".to_string(),
                })
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), Arc::new(FailingBackend));

        let meta = UploadMeta {
            filename: "tart.jpg".to_string(),
            declared_type: Some("image/jpeg".to_string()),
        };
        let err = service
            .ingest(&meta, Cursor::new(jpeg_bytes(512)))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Remote(_)));
        assert!(dir_is_empty(dir.path()));
    }

    #[test]
    fn test_resolve_media_type() {
        assert_eq!(
            resolve_media_type(Some("image/jpeg"), &[]).unwrap(),
            "image/jpeg"
        );
        // Declared non-image falls back to sniffing
        let png_magic = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(
            resolve_media_type(Some("application/octet-stream"), &png_magic).unwrap(),
            "image/png"
        );
        assert!(resolve_media_type(Some("text/plain"), b"hello").is_err());
        assert!(resolve_media_type(None, b"hello").is_err());
    }
}
