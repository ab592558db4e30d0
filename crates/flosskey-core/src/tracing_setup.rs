use std::fs::OpenOptions;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable naming an extra debug log file
pub const LOG_FILE_ENV: &str = "FLOSSKEY_LOG_FILE";

pub fn init_tracing() -> Result<()> {
    init_tracing_with_default("info")
}

/// Install the global subscriber: stderr filtered by `RUST_LOG` (falling back
/// to `default_filter`), plus a DEBUG file layer when `FLOSSKEY_LOG_FILE` is set.
pub fn init_tracing_with_default(default_filter: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    let registry = tracing_subscriber::registry().with(stderr_layer);

    if let Ok(log_path) = std::env::var(LOG_FILE_ENV) {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file: {}", log_path))?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG);

        registry
            .with(file_layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;
        tracing::info!("File logging enabled: {}", log_path);
    } else {
        registry
            .try_init()
            .context("Failed to install tracing subscriber")?;
    }

    Ok(())
}
