//! Rivertown chat server
//!
//! Serves the chat API in front of the configured model provider.

use axum::http::HeaderName;
use rivertown_chat::api::{create_router, AppState};
use rivertown_chat::config::Config;
use rivertown_chat::emitter::Emitter;
use rivertown_chat::llm;
use rivertown_chat::protocol::FRAME_MODE_HEADER;
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rivertown_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration; anything missing stops us here
    let config = Config::from_env().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        e
    })?;

    let service = llm::connect(&config.llm)?;
    tracing::info!(
        provider = %config.llm.provider(),
        model = %service.model_id(),
        frame_mode = %config.emitter.frame_mode,
        stream_delay = ?config.emitter.stream_delay,
        "LLM provider initialized"
    );

    let state = AppState::new(Emitter::new(service, config.emitter));

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(FRAME_MODE_HEADER)]);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Rivertown chat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
