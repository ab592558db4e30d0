use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use anyhow::Result;

/// A local alert handed to the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Unique within the process so alerts never replace each other
    pub id: u32,
    pub title: String,
    pub body: String,
    /// Account the alert belongs to; enough for the host to route a tap
    pub account_key: String,
}

/// Platform alerting facility
pub trait AlertSink: Send + Sync {
    fn deliver(&self, alert: &Alert) -> Result<()>;
}

/// Writes alerts to the log only
#[derive(Debug, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn deliver(&self, alert: &Alert) -> Result<()> {
        tracing::info!(
            alert_id = alert.id,
            account = %alert.account_key,
            "{}: {}",
            alert.title,
            alert.body
        );
        Ok(())
    }
}

/// Forwards alerts to the host application over a channel
#[derive(Debug, Clone)]
pub struct ChannelAlertSink {
    tx: Sender<Alert>,
}

impl ChannelAlertSink {
    pub fn new(tx: Sender<Alert>) -> Self {
        Self { tx }
    }
}

impl AlertSink for ChannelAlertSink {
    fn deliver(&self, alert: &Alert) -> Result<()> {
        self.tx
            .send(alert.clone())
            .map_err(|_| anyhow::anyhow!("alert receiver has been dropped"))
    }
}

/// Assigns alert ids and delivers best-effort.
///
/// Delivery failures are logged and swallowed; they never fail a cycle.
pub struct Dispatcher {
    sink: Arc<dyn AlertSink>,
    title: String,
    next_id: AtomicU32,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn AlertSink>, title: impl Into<String>) -> Self {
        Self {
            sink,
            title: title.into(),
            next_id: AtomicU32::new(0),
        }
    }

    /// Deliver one alert. Returns its id when the sink accepted it.
    pub fn dispatch(&self, account_key: &str, body: String) -> Option<u32> {
        let alert = Alert {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            title: self.title.clone(),
            body,
            account_key: account_key.to_string(),
        };

        match self.sink.deliver(&alert) {
            Ok(()) => Some(alert.id),
            Err(e) => {
                tracing::warn!(
                    alert_id = alert.id,
                    account = %alert.account_key,
                    "Failed to deliver alert: {}",
                    e
                );
                None
            }
        }
    }
}
