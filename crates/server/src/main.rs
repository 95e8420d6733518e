// crates/server/src/main.rs
//! Coach backend binary.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use coach_db::Database;
use coach_observability::{init_tracing, metrics::init_metrics};
use coach_server::{create_app, AppState, Catalog, ServerConfig};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    let observability = init_tracing(env!("CARGO_PKG_NAME"))?;
    if observability.sentry_enabled() {
        tracing::info!("error reporting enabled");
    }
    init_metrics();

    let config = ServerConfig::from_env()?;

    let db = match &config.db_path {
        Some(path) => Database::new(path).await?,
        None => Database::open_default().await?,
    };
    let catalog = Catalog::embedded().context("embedded catalog is invalid")?;
    let state = AppState::new(db, config.identity(), catalog);
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "coach backend listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("coach backend stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
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
    tracing::info!("shutdown signal received");
}
