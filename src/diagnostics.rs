//! Console diagnostics
//!
//! Problems inside the writer and the summary updater are reported through
//! `tracing`. The binary routes them to stderr; library users install their own
//! subscriber.

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "logtally=info";

/// Install a stderr subscriber filtered by `RUST_LOG`
pub fn init_console_logging() -> Result<()> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()?;

    Ok(())
}
