use std::env;
use std::path::PathBuf;

/// Credentials for the remote media-processing service.
#[derive(Debug, Clone)]
pub struct MediaCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl MediaCredentials {
    pub fn is_configured(&self) -> bool {
        !self.cloud_name.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

/// Configuration for the image ingestion pipeline
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Maximum upload size in bytes (default: 10 MiB)
    pub max_upload_size: usize,

    /// Directory for per-request scratch files (default: system temp dir)
    pub scratch_dir: PathBuf,

    /// Logical folder assets are stored under on the remote service
    pub asset_folder: String,

    /// Quality normalization applied by the remote service (default: "auto:good")
    pub quality: String,

    /// Format normalization applied by the remote service (default: "auto")
    pub fetch_format: String,

    /// Timeout for the remote submission, in seconds (default: 30)
    pub remote_timeout_secs: u64,

    /// Remote media service credentials
    pub credentials: MediaCredentials,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_size: 10 * 1024 * 1024, // 10 MiB
            scratch_dir: env::temp_dir(),
            asset_folder: "bakery-products".to_string(),
            quality: "auto:good".to_string(),
            fetch_format: "auto".to_string(),
            remote_timeout_secs: 30,
            credentials: MediaCredentials {
                cloud_name: String::new(),
                api_key: String::new(),
                api_secret: String::new(),
            },
        }
    }
}

impl UploadConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_size),

            scratch_dir: env::var("SCRATCH_DIR")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(default.scratch_dir),

            asset_folder: env::var("ASSET_FOLDER").unwrap_or(default.asset_folder),

            quality: env::var("ASSET_QUALITY").unwrap_or(default.quality),

            fetch_format: env::var("ASSET_FETCH_FORMAT").unwrap_or(default.fetch_format),

            remote_timeout_secs: env::var("REMOTE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.remote_timeout_secs),

            credentials: MediaCredentials {
                cloud_name: env::var("CLOUDINARY_CLOUD_NAME").unwrap_or_default(),
                api_key: env::var("CLOUDINARY_API_KEY").unwrap_or_default(),
                api_secret: env::var("CLOUDINARY_API_SECRET").unwrap_or_default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UploadConfig::default();
        assert_eq!(config.max_upload_size, 10 * 1024 * 1024);
        assert_eq!(config.asset_folder, "bakery-products");
        assert_eq!(config.quality, "auto:good");
        assert_eq!(config.fetch_format, "auto");
        assert_eq!(config.remote_timeout_secs, 30);
        assert!(!config.credentials.is_configured());
    }

    #[test]
    fn test_from_env_overrides() {
        unsafe {
            env::set_var("MAX_UPLOAD_SIZE", "1048576");
            env::set_var("ASSET_FOLDER", "test-folder");
        }
        let config = UploadConfig::from_env();
        unsafe {
            env::remove_var("MAX_UPLOAD_SIZE");
            env::remove_var("ASSET_FOLDER");
        }
        assert_eq!(config.max_upload_size, 1048576);
        assert_eq!(config.asset_folder, "test-folder");
    }

    #[test]
    fn test_credentials_configured() {
        let mut creds = MediaCredentials {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
        };
        assert!(creds.is_configured());
        creds.api_secret.clear();
        assert!(!creds.is_configured());
    }
}
