//! Logging, error reporting and metrics shared by the coach services.

pub mod metrics;
mod request_id;

pub use request_id::{with_http_layers, with_request_timeout, MakeRequestUlid, REQUEST_ID_HEADER};

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Selects JSON log lines instead of compact text.
pub const LOG_FORMAT_ENV: &str = "COACH_LOG_FORMAT";
/// Enables Sentry error reporting when set.
pub const SENTRY_DSN_ENV: &str = "SENTRY_DSN";

/// Keeps the Sentry client alive. Drop it last, after the server stops.
#[must_use = "dropping the guard flushes and disables error reporting"]
pub struct ObservabilityGuard {
    sentry: Option<sentry::ClientInitGuard>,
}

impl ObservabilityGuard {
    pub fn sentry_enabled(&self) -> bool {
        self.sentry.as_ref().is_some_and(|g| g.is_enabled())
    }
}

/// Default filter: warnings everywhere, `info` for the service crate.
pub fn default_filter(service: &str) -> String {
    format!("warn,{}=info", service.replace('-', "_"))
}

/// Install the global subscriber for `service` (its crate name).
///
/// `RUST_LOG` overrides [`default_filter`].
pub fn init_tracing(service: &str) -> anyhow::Result<ObservabilityGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(service)))
        .context("invalid log filter")?;

    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let sentry_guard = std::env::var(SENTRY_DSN_ENV)
        .ok()
        .filter(|dsn| !dsn.trim().is_empty())
        .map(|dsn| {
            sentry::init((
                dsn,
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    server_name: Some(service.to_string().into()),
                    ..Default::default()
                },
            ))
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer().compact()))
        .with(sentry_guard.as_ref().map(|_| sentry_tracing::layer()))
        .try_init()
        .context("tracing subscriber already installed")?;

    Ok(ObservabilityGuard {
        sentry: sentry_guard,
    })
}
