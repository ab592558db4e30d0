use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::CoreConfig;
use crate::dispatcher::{AlertSink, Dispatcher};
use crate::fetcher::{NotificationFetcher, NotificationSource};
use crate::formatter::Formatter;
use crate::models::Account;
use crate::poller::{CycleOutcome, Poller};
use crate::scheduler::{ScheduleCoordinator, ScheduleStatus};
use crate::store::WatermarkStore;

/// Everything the host needs, wired from one [`CoreConfig`].
///
/// `register_all` and `cancel_all` are the only calls required to drive
/// background polling; `check_once` runs a single foreground pass.
pub struct CoreRuntime {
    config: CoreConfig,
    poller: Arc<Poller>,
    coordinator: ScheduleCoordinator,
}

impl CoreRuntime {
    /// Open the on-disk watermark store and build the HTTP poller
    pub fn new(config: CoreConfig, sink: Arc<dyn AlertSink>) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("Failed to create data dir: {}", config.data_dir.display())
        })?;
        let watermarks = WatermarkStore::open_sqlite(config.watermark_db_path())
            .context("Failed to open watermark database")?;
        let source =
            NotificationFetcher::from_config(&config).context("Failed to build HTTP client")?;

        Self::with_parts(config, Arc::new(source), Arc::new(watermarks), sink)
    }

    /// Build from explicit collaborators
    pub fn with_parts(
        config: CoreConfig,
        source: Arc<dyn NotificationSource>,
        watermarks: Arc<WatermarkStore>,
        sink: Arc<dyn AlertSink>,
    ) -> Result<Self> {
        let dispatcher = Arc::new(Dispatcher::new(sink, config.alert_title.clone()));
        let poller = Arc::new(Poller::new(
            source,
            watermarks,
            Formatter::new(config.locale),
            dispatcher,
        ));
        let coordinator = ScheduleCoordinator::new(poller.clone(), config.clone())?;

        Ok(Self {
            config,
            poller,
            coordinator,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn watermarks(&self) -> &Arc<WatermarkStore> {
        self.poller.watermarks()
    }

    pub fn register_all(&self, accounts: Vec<Account>) -> usize {
        self.coordinator.register_all(accounts)
    }

    pub fn cancel_all(&self) {
        self.coordinator.cancel_all();
    }

    pub fn schedules(&self) -> Vec<ScheduleStatus> {
        self.coordinator.schedules()
    }

    /// One cycle per account, concurrently, outside any schedule
    pub async fn check_once(&self, accounts: &[Account]) -> Vec<(Account, CycleOutcome)> {
        let cycles = accounts.iter().map(|account| async move {
            (account.clone(), self.poller.run_cycle(account).await)
        });
        futures::future::join_all(cycles).await
    }

    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::ChannelAlertSink;
    use crate::error::PollError;
    use crate::models::{RawEvent, RawUser};
    use async_trait::async_trait;
    use std::sync::mpsc;

    struct OneFollow;

    #[async_trait]
    impl NotificationSource for OneFollow {
        async fn fetch(&self, account: &Account) -> Result<Vec<RawEvent>, PollError> {
            if account.schedule_id == 2 {
                return Err(PollError::Fetch { status_code: 500 });
            }
            Ok(vec![RawEvent {
                event_type: "follow".to_string(),
                created_at: "2024-01-02T00:00:00Z".to_string(),
                user: Some(RawUser {
                    name: Some("Alice".to_string()),
                    username: None,
                }),
                reaction: None,
            }])
        }
    }

    #[tokio::test]
    async fn test_check_once_reports_each_account() {
        let (tx, rx) = mpsc::channel();
        let runtime = CoreRuntime::with_parts(
            CoreConfig::new("/tmp/flosskey-test"),
            Arc::new(OneFollow),
            Arc::new(WatermarkStore::in_memory()),
            Arc::new(ChannelAlertSink::new(tx)),
        )
        .unwrap();

        let accounts = vec![
            Account::new("misskey.io", "token-1", 1),
            Account::new("misskey.io", "token-2", 2),
        ];
        let results = runtime.check_once(&accounts).await;

        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_success());
        assert!(!results[1].1.is_success());

        let alerts: Vec<_> = rx.try_iter().collect();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].account_key, "misskey.io#1");
    }

    #[tokio::test]
    async fn test_new_creates_sqlite_store_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig::new(dir.path().join("data"));
        let runtime = CoreRuntime::new(config.clone(), Arc::new(crate::dispatcher::LogAlertSink))
            .unwrap();

        assert!(config.watermark_db_path().exists());
        assert_eq!(runtime.register_all(Vec::new()), 0);
        runtime.shutdown().await;
    }
}
