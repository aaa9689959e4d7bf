use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::services::credentials::StorageCredentials;
use crate::services::pipeline::{ImageRequest, PipelineError};
use crate::services::scratch::ScratchSpace;
use crate::services::storage::{ObjectStore, ObjectStoreError};

pub struct ImageFetcher {
    store: Arc<dyn ObjectStore>,
    default_extension: String,
}

impl ImageFetcher {
    pub fn new(store: Arc<dyn ObjectStore>, default_extension: String) -> Self {
        Self {
            store,
            default_extension,
        }
    }

    /// Stream the source object into a scratch file. Returns the local
    /// path only once the file is fully flushed and synced; downstream
    /// stages must never see a partially written file.
    pub async fn fetch(
        &self,
        request: &ImageRequest,
        creds: &StorageCredentials,
        scratch: &mut ScratchSpace,
    ) -> Result<PathBuf, PipelineError> {
        let extension = derive_extension(&request.raw_image.key, &self.default_extension);
        let dest = scratch.register(&format!("{}{}", request.file_name, extension));

        let mut reader = self
            .store
            .get_object_stream(creds, &request.raw_image.bucket, &request.raw_image.key)
            .await
            .map_err(|e| match e {
                ObjectStoreError::NotFound { bucket, key } => {
                    PipelineError::SourceNotFound { bucket, key }
                }
                other => PipelineError::Transfer(other.to_string()),
            })?;

        let mut file = tokio::fs::File::create(&dest)
            .await
            .map_err(|e| PipelineError::Transfer(e.to_string()))?;

        let bytes = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(|e| PipelineError::Transfer(e.to_string()))?;

        file.flush()
            .await
            .map_err(|e| PipelineError::Transfer(e.to_string()))?;
        file.sync_all()
            .await
            .map_err(|e| PipelineError::Transfer(e.to_string()))?;

        info!(bytes, path = %dest.display(), "source image fetched");
        Ok(dest)
    }
}

/// Extension of the source key including the dot, or the configured
/// default when the key has none.
fn derive_extension(key: &str, default_extension: &str) -> String {
    match key.rfind('.') {
        Some(idx) => key[idx..].to_string(),
        None => format!(".{}", default_extension),
    }
}
