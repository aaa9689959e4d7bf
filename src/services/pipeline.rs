use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::config::PipelineConfig;
use crate::services::credentials::{CredentialCache, EncryptedCredentials, SecretDecryptor};
use crate::services::fetcher::ImageFetcher;
use crate::services::publisher::ImagePublisher;
use crate::services::scratch::ScratchSpace;
use crate::services::storage::ObjectStore;
use crate::services::transcoder::ImageTranscoder;

/// Source object reference inside the incoming event.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawImageRef {
    pub bucket: String,
    pub key: String,
}

/// One transcode request, parsed from the invocation payload.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    pub file_name: String,
    pub raw_image: RawImageRef,
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishedImage {
    /// Scheme + host of the published object's location
    pub base_url: String,
    /// Destination object key
    pub path: String,
}

/// One variant per pipeline stage. Scratch cleanup failures are logged,
/// never surfaced here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("credential decryption failed: {0}")]
    Decryption(String),

    #[error("source object not found: {bucket}/{key}")]
    SourceNotFound { bucket: String, key: String },

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("transcode failed: {0}")]
    Transcode(String),

    #[error("upload failed: {0}")]
    Upload(String),
}

/// Sequences credential resolution, fetch, transcode and publish for one
/// request, and owns the scratch files the stages leave behind.
pub struct PipelineOrchestrator {
    decryptor: Arc<dyn SecretDecryptor>,
    credentials: CredentialCache,
    fetcher: ImageFetcher,
    transcoder: ImageTranscoder,
    publisher: ImagePublisher,
    scratch_root: PathBuf,
}

impl PipelineOrchestrator {
    pub fn new(
        config: &PipelineConfig,
        decryptor: Arc<dyn SecretDecryptor>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            decryptor,
            credentials: CredentialCache::new(EncryptedCredentials {
                access_key_id: config.encrypted_access_key_id.clone(),
                secret_access_key: config.encrypted_secret_access_key.clone(),
                region: config.encrypted_region.clone(),
            }),
            fetcher: ImageFetcher::new(store.clone(), config.default_extension.clone()),
            transcoder: ImageTranscoder::new(config.max_width),
            publisher: ImagePublisher::new(store, config.dest_bucket.clone()),
            scratch_root: config.scratch_root.clone(),
        }
    }

    /// Run the full fetch → transcode → publish pipeline for one request.
    ///
    /// Every scratch file created during the run is removed exactly once
    /// before this returns, whether the run succeeded or failed at any
    /// stage.
    pub async fn run(&self, request: &ImageRequest) -> Result<PublishedImage, PipelineError> {
        let mut scratch = ScratchSpace::create(&self.scratch_root).await.map_err(|e| {
            PipelineError::Transfer(format!("failed to create scratch directory: {}", e))
        })?;

        let result = self.execute(request, &mut scratch).await;
        scratch.cleanup().await;

        match &result {
            Ok(published) => info!(
                file_name = %request.file_name,
                path = %published.path,
                "pipeline succeeded"
            ),
            Err(e) => error!(
                file_name = %request.file_name,
                error = %e,
                "pipeline failed"
            ),
        }

        result
    }

    async fn execute(
        &self,
        request: &ImageRequest,
        scratch: &mut ScratchSpace,
    ) -> Result<PublishedImage, PipelineError> {
        let creds = self
            .credentials
            .get_or_resolve(self.decryptor.as_ref())
            .await?;

        let fetched = self.fetcher.fetch(request, creds, scratch).await?;
        let converted = self.transcoder.transcode(&fetched, request, scratch).await?;
        self.publisher.publish(&converted, creds).await
    }
}
