use std::sync::Arc;

use anyhow::{Context, Result};
use flosskey_core::models::account_key;
use flosskey_core::secure_storage::SecureStorage;
use flosskey_core::{CoreRuntime, CycleOutcome, WatermarkStore};

use super::config::CliConfig;
use super::terminal::TerminalAlertSink;

/// Run one cycle for every valid account. Returns the number of failed cycles.
pub async fn check(config: &CliConfig) -> Result<usize> {
    let runtime = CoreRuntime::new(config.core_config()?, Arc::new(TerminalAlertSink))?;
    let accounts = config.registry().list_accounts();
    if accounts.is_empty() {
        eprintln!("No valid accounts configured");
        return Ok(0);
    }

    let mut failures = 0;
    for (account, outcome) in runtime.check_once(&accounts).await {
        match outcome {
            CycleOutcome::Completed(report) => eprintln!(
                "{}: {} fetched, {} new, {} shown, watermark {}",
                account.key(),
                report.fetched,
                report.unseen,
                report.delivered,
                report.watermark.to_iso8601()
            ),
            CycleOutcome::Failed(e) => {
                failures += 1;
                eprintln!("{}: failed: {}", account.key(), e);
            }
        }
    }
    Ok(failures)
}

/// Print the accounts that would be scheduled and the entries that were skipped
pub fn list_accounts(config: &CliConfig) -> Result<()> {
    let (accounts, skipped) = config.registry().partition();

    for account in &accounts {
        println!(
            "{}\t{}\t{}",
            account.schedule_id,
            account.instance,
            account.notifications_url()
        );
    }
    for entry in &skipped {
        eprintln!("skipped schedule id {}: {}", entry.schedule_id, entry.error);
    }
    Ok(())
}

pub fn set_token(instance: &str, schedule_id: u32, token: &str) -> Result<()> {
    let token = token.trim();
    anyhow::ensure!(!token.is_empty(), "Access token is empty");
    SecureStorage::set_access_token(instance, schedule_id, token)
        .context("Failed to store access token")?;
    eprintln!("Stored access token for {}", account_key(instance, schedule_id));
    Ok(())
}

pub async fn reset_watermark(config: &CliConfig, instance: &str, schedule_id: u32) -> Result<()> {
    let core = config.core_config()?;
    let store = WatermarkStore::open_sqlite(core.watermark_db_path())
        .context("Failed to open watermark database")?;
    let key = account_key(instance, schedule_id);
    store
        .reset(&key)
        .await
        .with_context(|| format!("Failed to reset watermark for {}", key))?;
    eprintln!("Reset watermark for {}", key);
    Ok(())
}
