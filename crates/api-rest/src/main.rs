//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging. Set `REGISTRY_STORE=memory` to run without any database.
//! The workspace's main `registry-run` binary serves the same router.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use registry_core::{connect_stores, CoreConfig};

/// Main entry point for the registry REST API server
///
/// # Environment Variables
/// - `REGISTRY_REST_ADDR`: Server address (default: "0.0.0.0:8000")
/// - see `CoreConfig::from_lookup` for the store settings
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid,
/// - the primary store cannot be reached,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("registry_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("REGISTRY_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());
    let cfg = CoreConfig::from_lookup(|key| std::env::var(key).ok())?;

    let stores = connect_stores(&cfg).await?;
    let app = router(AppState::from_stores(&stores), cfg.api_prefix());

    tracing::info!("-- Starting registry REST API on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
