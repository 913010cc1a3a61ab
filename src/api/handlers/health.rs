use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub ocr_engine: String,
    pub ocr_available: bool,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/test",
    responses(
        (status = 200, description = "Connectivity probe", body = MessageResponse)
    ),
    tag = "system"
)]
pub async fn test_connection() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Connection successful!".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let engine = state.ocr_service.engine();

    Json(HealthResponse {
        status: "ok".to_string(),
        ocr_engine: engine.name().to_string(),
        ocr_available: engine.health_check().await,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
