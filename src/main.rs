use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use state_relay::{bootstrap, config::RelayConfig, router::build_router, state::AppState};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "state_relay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RelayConfig::from_env();

    let listener =
        match bootstrap::bind_with_retry(&config.host, config.port, config.port_attempts).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!("Failed to start server: {}", e);
                std::process::exit(1);
            }
        };
    let port = listener
        .local_addr()
        .map(|addr| addr.port())
        .unwrap_or(config.port);

    let state = Arc::new(AppState::new(config));
    let app = build_router(state);

    tracing::info!("Realtime relay running on http://localhost:{}", port);
    tracing::info!("Open /mod for moderator and /view for viewer.");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
