use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

/// Service status
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is up", body = StatusResponse)),
    tag = "health"
)]
pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Plain `OK`", body = String)),
    tag = "health"
)]
pub async fn health() -> &'static str {
    "OK"
}
