pub mod api;
pub mod config;
pub mod services;

use crate::config::UploadConfig;
use crate::services::ingestion::IngestionService;
use axum::{
    Router,
    routing::{get, options},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Headroom on top of the upload ceiling for multipart boundaries and
/// companion text fields
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::upload::upload_image,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::upload::UploadResponse,
            api::handlers::health::HealthResponse,
            services::media::RemoteAssetResult,
        )
    ),
    tags(
        (name = "upload", description = "Product image ingestion"),
        (name = "system", description = "Service health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: UploadConfig,
    pub ingestion: Arc<IngestionService>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/upload",
            options(api::handlers::upload::preflight)
                .post(api::handlers::upload::upload_image)
                .fallback(api::handlers::upload::method_not_allowed)
                .layer(axum::extract::DefaultBodyLimit::max(
                    state.config.max_upload_size + MULTIPART_OVERHEAD,
                )),
        )
        // The storefront is served from a different origin, so CORS headers
        // must appear on every response path, error paths included.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .with_state(state)
}
