use crate::api::handlers::{chat, config, health, ws};
use crate::auth::require_config_token;
use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

/// Largest request body accepted by any route.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    info(title = "VEX", description = "Conversational assistant server"),
    paths(
        health::root,
        health::health,
        chat::chat,
        config::get_config,
        config::update_config,
    ),
    components(schemas(
        crate::types::ChatMessage,
        crate::types::ChatRequest,
        crate::types::ChatResponse,
        crate::types::RuntimeConfig,
        crate::types::Mode,
        health::StatusResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "chat", description = "Chat endpoints"),
        (name = "config", description = "Runtime configuration"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "x_token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Token"))),
            );
        }
    }
}

/// Build the full application router with state applied.
pub fn create_router(state: AppState) -> Router {
    let config_routes = Router::new()
        .route(
            "/config",
            get(config::get_config).post(config::update_config),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_config_token,
        ));

    let api_routes = Router::new()
        .route("/chat", post(chat::chat))
        .route("/chat/ws", get(ws::chat_ws))
        .merge(config_routes);

    let router = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .nest("/api", api_routes);

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
