use std::env;
use std::path::PathBuf;

/// Pipeline configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Base64 blob holding the sealed storage access key id
    pub encrypted_access_key_id: String,

    /// Base64 blob holding the sealed storage secret access key
    pub encrypted_secret_access_key: String,

    /// Base64 blob holding the sealed storage region
    pub encrypted_region: String,

    /// Master secret the credential blobs are sealed under
    pub master_secret: String,

    /// Destination bucket for transcoded images (default: "processed-images")
    pub dest_bucket: String,

    /// Maximum output width in pixels (default: 720)
    pub max_width: u32,

    /// Extension used when the source key has none, without the dot (default: "jpeg")
    pub default_extension: String,

    /// Root directory under which per-run scratch directories are created
    pub scratch_root: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            encrypted_access_key_id: String::new(),
            encrypted_secret_access_key: String::new(),
            encrypted_region: String::new(),
            // Fallback for dev convenience, real deployments set MASTER_SECRET
            master_secret: "master_secret_default".to_string(),
            dest_bucket: "processed-images".to_string(),
            max_width: 720,
            default_extension: "jpeg".to_string(),
            scratch_root: env::temp_dir(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            encrypted_access_key_id: env::var("ENCRYPTED_ACCESS_KEY_ID")
                .unwrap_or(default.encrypted_access_key_id),

            encrypted_secret_access_key: env::var("ENCRYPTED_SECRET_ACCESS_KEY")
                .unwrap_or(default.encrypted_secret_access_key),

            encrypted_region: env::var("ENCRYPTED_REGION").unwrap_or(default.encrypted_region),

            master_secret: env::var("MASTER_SECRET").unwrap_or(default.master_secret),

            dest_bucket: env::var("DEST_BUCKET").unwrap_or(default.dest_bucket),

            max_width: env::var("MAX_IMAGE_WIDTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_width),

            default_extension: env::var("DEFAULT_SOURCE_EXTENSION")
                .map(|v| v.trim_start_matches('.').to_string())
                .unwrap_or(default.default_extension),

            scratch_root: env::var("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.scratch_root),
        }
    }
}
