use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ObjectCannedAcl, StorageClass};
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::services::credentials::StorageCredentials;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("storage error: {0}")]
    Other(String),
}

/// Object metadata applied when publishing.
#[derive(Debug, Clone)]
pub struct PutOptions {
    pub content_type: String,
    pub cache_control: String,
    pub public_read: bool,
    pub reduced_redundancy: bool,
}

/// Where a put landed.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Absolute URL of the stored object
    pub location: String,
    pub key: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object_stream(
        &self,
        creds: &StorageCredentials,
        bucket: &str,
        key: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, ObjectStoreError>;

    async fn put_object(
        &self,
        creds: &StorageCredentials,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        options: &PutOptions,
    ) -> Result<StoredObject, ObjectStoreError>;
}

/// S3-backed store. Clients are built per call from the resolved
/// credentials, so the store itself carries no credential state.
#[derive(Default)]
pub struct S3ObjectStore;

impl S3ObjectStore {
    pub fn new() -> Self {
        Self
    }

    async fn client_for(creds: &StorageCredentials) -> Client {
        let aws_config = aws_config::from_env()
            .region(Region::new(creds.region.clone()))
            .credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                None,
                None,
                "static",
            ))
            .load()
            .await;

        Client::new(&aws_config)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object_stream(
        &self,
        creds: &StorageCredentials,
        bucket: &str,
        key: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, ObjectStoreError> {
        let client = Self::client_for(creds).await;

        let res = client.get_object().bucket(bucket).key(key).send().await;

        match res {
            Ok(output) => Ok(Box::new(output.body.into_async_read())),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    Err(ObjectStoreError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    })
                } else {
                    Err(ObjectStoreError::Other(service_error.to_string()))
                }
            }
        }
    }

    async fn put_object(
        &self,
        creds: &StorageCredentials,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        options: &PutOptions,
    ) -> Result<StoredObject, ObjectStoreError> {
        let client = Self::client_for(creds).await;

        let mut req = client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(options.content_type.clone())
            .cache_control(options.cache_control.clone());

        if options.public_read {
            req = req.acl(ObjectCannedAcl::PublicRead);
        }
        if options.reduced_redundancy {
            req = req.storage_class(StorageClass::ReducedRedundancy);
        }

        req.send()
            .await
            .map_err(|e| ObjectStoreError::Other(e.into_service_error().to_string()))?;

        // PutObject does not report a location; S3 object URLs follow the
        // virtual-hosted form.
        let location = format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            bucket, creds.region, key
        );

        Ok(StoredObject {
            location,
            key: key.to_string(),
        })
    }
}
