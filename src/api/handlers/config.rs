use crate::{types::RuntimeConfig, AppState};
use axum::{extract::State, Json};

/// Read the runtime configuration
#[utoipa::path(
    get,
    path = "/api/config",
    responses(
        (status = 200, description = "Current runtime configuration", body = RuntimeConfig),
        (status = 401, description = "Missing or wrong X-Token")
    ),
    tag = "config",
    security(("x_token" = []))
)]
pub async fn get_config(State(state): State<AppState>) -> Json<RuntimeConfig> {
    Json(state.config.snapshot())
}

/// Replace the runtime configuration
#[utoipa::path(
    post,
    path = "/api/config",
    request_body = RuntimeConfig,
    responses(
        (status = 200, description = "Stored configuration", body = RuntimeConfig),
        (status = 401, description = "Missing or wrong X-Token"),
        (status = 422, description = "Malformed configuration")
    ),
    tag = "config",
    security(("x_token" = []))
)]
pub async fn update_config(
    State(state): State<AppState>,
    Json(update): Json<RuntimeConfig>,
) -> Json<RuntimeConfig> {
    Json(state.config.replace(update))
}
