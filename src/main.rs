use anyhow::Result;

use logtally::config::Config;
use logtally::{diagnostics, summary};

#[tokio::main]
async fn main() -> Result<()> {
    diagnostics::init_console_logging()?;

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Using default configuration: {:#}", e);
            Config::default()
        }
    };

    tracing::debug!("Summarizing {}", config.logs_dir.display());

    // Failures are reported as diagnostics; the exit code stays 0
    summary::update_summary_file(&config).await;
    Ok(())
}
