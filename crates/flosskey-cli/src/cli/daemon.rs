use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use flosskey_core::CoreRuntime;
use tokio::signal::unix::{signal, SignalKind};

use super::config::CliConfig;
use super::terminal::TerminalAlertSink;

/// Poll every configured account until Ctrl-C or SIGTERM.
///
/// SIGHUP re-reads the config file and re-registers the whole account set.
/// Tunables such as the interval are fixed for the life of the process.
pub async fn run_daemon(config_path: &Path) -> Result<()> {
    let config = CliConfig::load(config_path)?;
    let core_config = config.core_config()?;
    tracing::info!(data_dir = %core_config.data_dir.display(), "Starting flosskey poller");

    let runtime = CoreRuntime::new(core_config, Arc::new(TerminalAlertSink))?;
    let registered = runtime.register_all(config.registry().list_accounts());
    if registered == 0 {
        tracing::warn!("No valid accounts configured; edit the config and send SIGHUP");
    }

    let mut hangup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                tracing::info!("Interrupted");
                break;
            }
            _ = terminate.recv() => {
                tracing::info!("Terminated");
                break;
            }
            _ = hangup.recv() => reload(&runtime, config_path),
        }
    }

    runtime.shutdown().await;
    tracing::info!("Poller stopped");
    Ok(())
}

/// Re-register from the config file; a bad file keeps the current schedules
fn reload(runtime: &CoreRuntime, config_path: &Path) {
    match CliConfig::load(config_path) {
        Ok(config) => {
            let registered = runtime.register_all(config.registry().list_accounts());
            tracing::info!(registered, "Reloaded account list");
        }
        Err(e) => {
            tracing::error!("Reload failed, keeping current schedules: {:#}", e);
        }
    }
}
