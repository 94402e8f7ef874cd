//! Pushcast API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use pushcast_common::config::AppConfig;
use pushcast_engine::{Dispatcher, JsonFileStore, Registry};
use pushcast_notifier::WebPushTransport;

use pushcast_api::routes::create_router;
use pushcast_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            "pushcast_api=debug,pushcast_engine=debug,pushcast_notifier=debug,tower_http=debug",
        )
    });
    if config.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!("Starting Pushcast API server...");

    // Restore subscribers
    let store = Arc::new(JsonFileStore::new(&config.subscribers_file));
    let registry = Arc::new(Registry::load(store).await);

    // Push delivery
    let transport = Arc::new(
        WebPushTransport::from_pem_file(
            &config.vapid_private_key_path,
            config.vapid_subject.clone(),
            config.push_ttl_seconds,
        )
        .await?,
    );
    let dispatcher = Arc::new(Dispatcher::new(
        registry.clone(),
        transport,
        config.action_urls(),
    ));

    // Build application state
    let state = AppState::new(registry, dispatcher, config.vapid_public_key.clone());

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Pushcast API server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal, stopping gracefully...");
}
