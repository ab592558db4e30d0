use std::io::Write;

use anyhow::Result;
use flosskey_core::{Alert, AlertSink};

/// Prints each alert as one line on stdout
#[derive(Debug, Default)]
pub struct TerminalAlertSink;

impl AlertSink for TerminalAlertSink {
    fn deliver(&self, alert: &Alert) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", format_alert(alert))?;
        stdout.flush()?;
        Ok(())
    }
}

pub fn format_alert(alert: &Alert) -> String {
    format!(
        "[#{}] {}: {} ({})",
        alert.id, alert.title, alert.body, alert.account_key
    )
}
