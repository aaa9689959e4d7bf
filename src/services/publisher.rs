use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use url::{Origin, Url};

use crate::services::credentials::StorageCredentials;
use crate::services::pipeline::{PipelineError, PublishedImage};
use crate::services::storage::{ObjectStore, PutOptions};

/// Extension of every published object
const PUBLISHED_EXTENSION: &str = "webp";

pub struct ImagePublisher {
    store: Arc<dyn ObjectStore>,
    dest_bucket: String,
}

impl ImagePublisher {
    pub fn new(store: Arc<dyn ObjectStore>, dest_bucket: String) -> Self {
        Self { store, dest_bucket }
    }

    /// Upload the transcoded file under a timestamp-derived key and derive
    /// the public base URL from the reported location.
    pub async fn publish(
        &self,
        path: &Path,
        creds: &StorageCredentials,
    ) -> Result<PublishedImage, PipelineError> {
        let body = tokio::fs::read(path)
            .await
            .map_err(|e| PipelineError::Upload(e.to_string()))?;

        let key = format!("{}.{}", Utc::now().timestamp_millis(), PUBLISHED_EXTENSION);

        let options = PutOptions {
            content_type: "binary/octet-stream".to_string(),
            cache_control: "0".to_string(),
            public_read: true,
            reduced_redundancy: true,
        };

        let stored = self
            .store
            .put_object(creds, &self.dest_bucket, &key, body, &options)
            .await
            .map_err(|e| PipelineError::Upload(e.to_string()))?;

        let base_url = derive_base_url(&stored.location)?;

        info!(
            bucket = %self.dest_bucket,
            key = %stored.key,
            base_url = %base_url,
            "transcoded image published"
        );

        Ok(PublishedImage {
            base_url,
            path: stored.key,
        })
    }
}

/// Scheme + host portion of the reported object location. A location that
/// does not parse as an absolute URL with a host fails the publish stage.
fn derive_base_url(location: &str) -> Result<String, PipelineError> {
    let parsed = Url::parse(location).map_err(|e| {
        PipelineError::Upload(format!("malformed upload location {:?}: {}", location, e))
    })?;

    match parsed.origin() {
        origin @ Origin::Tuple(..) => Ok(origin.ascii_serialization()),
        Origin::Opaque(_) => Err(PipelineError::Upload(format!(
            "upload location {:?} has no host",
            location
        ))),
    }
}
