use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;
use crate::api::error::AppError;
use crate::services::pipeline::{ImageRequest, PublishedImage};

#[derive(Serialize, ToSchema)]
pub struct TranscodeResponse {
    pub status: String,
    pub image: PublishedImage,
}

#[utoipa::path(
    post,
    path = "/transcode",
    request_body = ImageRequest,
    responses(
        (status = 200, description = "Image transcoded and published", body = TranscodeResponse),
        (status = 400, description = "Invalid request payload"),
        (status = 404, description = "Source object not found"),
        (status = 422, description = "Source image could not be transcoded"),
        (status = 502, description = "Storage transfer or upload failed"),
    ),
    tag = "pipeline"
)]
pub async fn transcode_image(
    State(state): State<AppState>,
    Json(request): Json<ImageRequest>,
) -> Result<Json<TranscodeResponse>, AppError> {
    validate_request(&request)?;

    tracing::info!(
        file_name = %request.file_name,
        bucket = %request.raw_image.bucket,
        key = %request.raw_image.key,
        "transcode request received"
    );

    let image = state.pipeline.run(&request).await?;

    Ok(Json(TranscodeResponse {
        status: "success".to_string(),
        image,
    }))
}

fn validate_request(request: &ImageRequest) -> Result<(), AppError> {
    if request.raw_image.key.is_empty() {
        return Err(AppError::BadRequest(
            "rawImage.key must not be empty".to_string(),
        ));
    }
    if request.raw_image.bucket.is_empty() {
        return Err(AppError::BadRequest(
            "rawImage.bucket must not be empty".to_string(),
        ));
    }
    if request.file_name.is_empty() {
        return Err(AppError::BadRequest(
            "fileName must not be empty".to_string(),
        ));
    }
    // fileName becomes a scratch file name; reject anything that could
    // escape the run directory.
    if request.file_name.contains(['/', '\\']) || request.file_name.contains("..") {
        return Err(AppError::BadRequest(
            "fileName must not contain path separators".to_string(),
        ));
    }

    Ok(())
}
