//! Console logging setup
//!
//! Cache layers log under the `survey_cache` target and the repository under
//! `survey_results`; degraded distributed-tier calls show up at `warn`.

use std::sync::OnceLock;
use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "survey_results=info,survey_cache=info";

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn subscriber_with<W>(writer: W, filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_level(true)
            .with_filter(filter),
    )
}

/// Install a fmt subscriber filtered by `RUST_LOG`
///
/// Safe to call more than once, and a no-op when the host application has
/// already set a global subscriber.
pub fn init_tracing() {
    LOGGER_INITIALIZED.get_or_init(|| {
        if subscriber_with(std::io::stdout, env_filter())
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already set, keeping it");
            return;
        }
        tracing::info!(target: "survey_results", "Logging initialized");
    });
}
