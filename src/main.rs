use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use registry_core::{connect_stores, CoreConfig, StoreBackend};

/// Main entry point for the patient registration service
///
/// Loads configuration, connects the primary store (and the mirror, when configured), then serves
/// the REST API until Ctrl-C.
///
/// # Environment Variables
/// - `REGISTRY_REST_ADDR`: REST server address (default: "0.0.0.0:8000")
/// - `DATABASE_URL` / `POSTGRES_URL`: primary store
/// - `MIRROR_DATABASE_URL`, `MIRROR_COLLECTION`: document mirror (optional)
/// - `REGISTRY_STORE`: `postgres` (default) or `memory`
/// - `REGISTRY_API_PREFIX`: mount point for the patient routes (default: "/api")
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, the primary store or the listener fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("registry_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("registry_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr: SocketAddr = std::env::var("REGISTRY_REST_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8000".into())
        .parse()?;
    let cfg = CoreConfig::from_lookup(|key| std::env::var(key).ok())?;

    match cfg.backend() {
        StoreBackend::Memory => {
            tracing::warn!("Running with in-memory stores, data is not persisted")
        }
        StoreBackend::Postgres { mirror: None, .. } => {
            tracing::info!("No mirror configured, registrations go to the primary store only")
        }
        StoreBackend::Postgres { .. } => {}
    }

    let stores = connect_stores(&cfg).await?;
    let app = router(AppState::from_stores(&stores), cfg.api_prefix());

    tracing::info!("++ Starting patient registration REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- Patient registration REST stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {:?}", e);
        std::future::pending::<()>().await;
    }
}
