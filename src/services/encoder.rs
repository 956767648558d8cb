use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

/// Self-describing textual form of an uploaded file, ready for submission
/// to the remote media service. Lives in memory for one request only.
#[derive(Debug, Clone)]
pub struct EncodedPayload {
    pub media_type: String,
    pub data_uri: String,
    /// Size of the raw (pre-encoding) file in bytes
    pub byte_len: usize,
}

/// Encode a scratch file as a `data:<media-type>;base64,<content>` URI.
///
/// Pure apart from the read: the same (media type, bytes) pair always
/// yields the same payload.
pub async fn encode_data_uri(media_type: &str, path: &Path) -> std::io::Result<EncodedPayload> {
    let bytes = tokio::fs::read(path).await?;
    let data_uri = format!("data:{};base64,{}", media_type, STANDARD.encode(&bytes));
    Ok(EncodedPayload {
        media_type: media_type.to_string(),
        data_uri,
        byte_len: bytes.len(),
    })
}
