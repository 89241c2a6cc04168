use std::sync::Arc;

use axum::Router;
use configs::AppConfig;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::routes::{self, AppState, RouterOptions};
use service::{relay::RelayService, storage::FileSnapshotStore};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Wire storage, relay and router from a loaded configuration.
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    common::env::ensure_env(&config.storage.data_dir, config.storage.dashboard_dir.as_deref())
        .await?;

    let store = FileSnapshotStore::new(&config.storage.data_dir).await?;
    let relay = RelayService::new(store, config.auth.upload_key.clone());
    let state = AppState { relay: Arc::new(relay) };

    Ok(routes::build_router(state, build_cors(), RouterOptions::from(config)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, finishing in-flight requests");
}

/// Public entry: build the app and run the HTTP server until a shutdown signal.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let app = build_app(&config).await?;

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))?;
    info!(
        %addr,
        data_dir = %config.storage.data_dir.display(),
        writes_enabled = config.auth.upload_key.is_some(),
        "relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("relay stopped");
    Ok(())
}
