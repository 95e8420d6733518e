// crates/wrapper/src/main.rs
//! Gateway binary.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use coach_observability::{init_tracing, metrics::init_metrics};
use coach_wrapper::{create_app, WrapperConfig, WrapperState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    let observability = init_tracing(env!("CARGO_PKG_NAME"))?;
    if observability.sentry_enabled() {
        tracing::info!("error reporting enabled");
    }
    init_metrics();
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    let config = WrapperConfig::from_env()?;
    let state = WrapperState::from_config(&config).context("failed to build upstream clients")?;
    if state.tts.is_none() {
        tracing::info!("TTS_API_KEY not set, speech synthesis disabled");
    }
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, agent = %config.agent_url, backend = %config.backend_url, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("gateway stopped");
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
