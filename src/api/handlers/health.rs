use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub remote: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let remote = if state.config.credentials.is_configured() {
        "configured"
    } else {
        "unconfigured"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        remote: remote.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
