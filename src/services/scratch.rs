use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A per-request temporary file holding the uploaded bytes.
///
/// The name carries a fresh UUID so concurrent requests never collide in
/// the shared temp namespace. The owning pipeline invocation must call
/// [`ScratchFile::cleanup`] on every exit path; `Drop` removes the file
/// best-effort if that was skipped (e.g. a panic unwound past the guard).
pub struct ScratchFile {
    path: PathBuf,
    released: bool,
}

impl ScratchFile {
    /// Claim a unique scratch path under `dir` and create the (empty) file.
    ///
    /// The original filename's extension is preserved so downstream
    /// consumers that infer media type from the name keep working.
    pub async fn create(dir: &Path, original_filename: &str) -> std::io::Result<Self> {
        let name = match sanitize_extension(original_filename) {
            Some(ext) => format!("upload-{}.{}", Uuid::new_v4().simple(), ext),
            None => format!("upload-{}", Uuid::new_v4().simple()),
        };
        let path = dir.join(name);
        drop(tokio::fs::File::create(&path).await?);
        tracing::debug!(path = %path.display(), "Scratch file created");
        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the scratch file. Tolerates "already gone" so a second
    /// cleanup attempt (or an externally removed file) is not an error.
    pub async fn cleanup(mut self) {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Scratch file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Failed to remove scratch file: {}", e)
            }
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Extract a filesystem-safe extension: short, alphanumeric, lowercased.
fn sanitize_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
