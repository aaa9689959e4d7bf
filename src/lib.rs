pub mod api;
pub mod config;
pub mod services;

use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::services::pipeline::PipelineOrchestrator;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::transcode::transcode_image,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            services::pipeline::ImageRequest,
            services::pipeline::RawImageRef,
            services::pipeline::PublishedImage,
            api::handlers::transcode::TranscodeResponse,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "pipeline", description = "Image transcode pipeline"),
        (name = "system", description = "Service health and metadata")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PipelineOrchestrator>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/transcode", post(api::handlers::transcode::transcode_image))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
