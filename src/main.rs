use anyhow::Context;
use clap::Parser;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vex::{cli::Cli, create_router, AppState, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings =
        Settings::load(cli.env_file.as_deref()).context("Failed to load settings")?;
    if let Some(host) = cli.host {
        settings.server.host = host;
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }

    // RUST_LOG wins over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if settings.server.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);
    tracing::info!(
        mode = ?settings.llm.mode,
        vector_backend = ?settings.memory.vector_backend,
        "Starting VEX"
    );

    let state = AppState::from_settings(settings)
        .await
        .context("Failed to initialise application state")?;
    tracing::info!(
        similarity_recall = state.memory.has_index(),
        "Memory ready"
    );

    let app = create_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
    );

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!("VEX listening on {}", bind_addr);
    tracing::info!("  GET  /            status");
    tracing::info!("  GET  /health      liveness probe");
    tracing::info!("  POST /api/chat    chat (JSON or text stream)");
    tracing::info!("  GET  /api/chat/ws chat over WebSocket");
    tracing::info!("  GET  /api/config  runtime configuration (X-Token)");

    axum::serve(listener, app).await.context("Server failed")?;
    Ok(())
}
