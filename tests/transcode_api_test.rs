use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use rust_image_pipeline::config::PipelineConfig;
use rust_image_pipeline::services::credentials::{SecretDecryptor, StorageCredentials};
use rust_image_pipeline::services::pipeline::PipelineOrchestrator;
use rust_image_pipeline::services::storage::{
    ObjectStore, ObjectStoreError, PutOptions, StoredObject,
};
use rust_image_pipeline::{AppState, create_app};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tower::ServiceExt;

struct FakeDecryptor;

#[async_trait]
impl SecretDecryptor for FakeDecryptor {
    async fn decrypt(&self, ciphertext_b64: &str) -> anyhow::Result<Vec<u8>> {
        match ciphertext_b64.strip_prefix("enc:") {
            Some(plain) => Ok(plain.as_bytes().to_vec()),
            None => Err(anyhow::anyhow!("unknown blob")),
        }
    }
}

struct InMemoryStore {
    objects: HashMap<(String, String), Vec<u8>>,
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get_object_stream(
        &self,
        _creds: &StorageCredentials,
        bucket: &str,
        key: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, ObjectStoreError> {
        match self.objects.get(&(bucket.to_string(), key.to_string())) {
            Some(data) => Ok(Box::new(Cursor::new(data.clone()))),
            None => Err(ObjectStoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
        }
    }

    async fn put_object(
        &self,
        creds: &StorageCredentials,
        bucket: &str,
        key: &str,
        _body: Vec<u8>,
        _options: &PutOptions,
    ) -> Result<StoredObject, ObjectStoreError> {
        Ok(StoredObject {
            location: format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                bucket, creds.region, key
            ),
            key: key.to_string(),
        })
    }
}

fn setup_app(scratch_root: &std::path::Path, objects: Vec<(&str, &str, Vec<u8>)>) -> axum::Router {
    let config = PipelineConfig {
        encrypted_access_key_id: "enc:AKIDEXAMPLE".to_string(),
        encrypted_secret_access_key: "enc:secret-key-value".to_string(),
        encrypted_region: "enc:ap-south-1".to_string(),
        master_secret: "test-master".to_string(),
        dest_bucket: "processed-images".to_string(),
        max_width: 720,
        default_extension: "jpeg".to_string(),
        scratch_root: scratch_root.to_path_buf(),
    };

    let store = InMemoryStore {
        objects: objects
            .into_iter()
            .map(|(bucket, key, data)| ((bucket.to_string(), key.to_string()), data))
            .collect(),
    };

    let pipeline = Arc::new(PipelineOrchestrator::new(
        &config,
        Arc::new(FakeDecryptor),
        Arc::new(store),
    ));

    create_app(AppState { pipeline })
}

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([120, 130, 140])));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg)
        .unwrap();
    out
}

#[tokio::test]
async fn transcode_endpoint_returns_structured_success() {
    let scratch = tempfile::tempdir().unwrap();
    let app = setup_app(
        scratch.path(),
        vec![("src-bucket", "img1.jpg", jpeg_bytes(1024, 768))],
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/transcode")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"fileName": "img1", "rawImage": {"bucket": "src-bucket", "key": "img1.jpg"}}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["status"], "success");
    assert_eq!(
        json["image"]["baseUrl"],
        "https://processed-images.s3.ap-south-1.amazonaws.com"
    );
    assert!(
        json["image"]["path"]
            .as_str()
            .unwrap()
            .ends_with(".webp")
    );
}

#[tokio::test]
async fn empty_key_is_rejected_as_invalid_request() {
    let scratch = tempfile::tempdir().unwrap();
    let app = setup_app(scratch.path(), vec![]);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/transcode")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"fileName": "img1", "rawImage": {"bucket": "src-bucket", "key": ""}}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["kind"], "invalid_request");
}

#[tokio::test]
async fn missing_source_maps_to_not_found() {
    let scratch = tempfile::tempdir().unwrap();
    let app = setup_app(scratch.path(), vec![]);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/transcode")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"fileName": "img1", "rawImage": {"bucket": "src-bucket", "key": "gone.jpg"}}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["kind"], "source_not_found");
}

#[tokio::test]
async fn unreadable_source_maps_to_unprocessable() {
    let scratch = tempfile::tempdir().unwrap();
    let app = setup_app(
        scratch.path(),
        vec![("src-bucket", "img1.jpg", b"garbage bytes".to_vec())],
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/transcode")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"fileName": "img1", "rawImage": {"bucket": "src-bucket", "key": "img1.jpg"}}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["kind"], "transcode_failed");
}

#[tokio::test]
async fn health_check_reports_ok() {
    let scratch = tempfile::tempdir().unwrap();
    let app = setup_app(scratch.path(), vec![]);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn request_id_is_echoed_on_the_response() {
    let scratch = tempfile::tempdir().unwrap();
    let app = setup_app(scratch.path(), vec![]);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .header("x-request-id", "test-request-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "test-request-42"
    );
}
