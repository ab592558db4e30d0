//! One polling cycle: fetch, deduplicate, format, persist, dispatch.

use std::sync::Arc;

use tracing::Instrument;

use crate::dedup::select_unseen;
use crate::dispatcher::Dispatcher;
use crate::error::PollError;
use crate::fetcher::NotificationSource;
use crate::formatter::Formatter;
use crate::models::{Account, Watermark};
use crate::store::WatermarkStore;

/// What a successful cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub unseen: usize,
    /// Alerts accepted by the sink
    pub delivered: usize,
    /// Unseen events whose type has no alert text
    pub suppressed: usize,
    pub watermark: Watermark,
}

/// Terminal state of a cycle; either way the account is re-armed
#[derive(Debug)]
pub enum CycleOutcome {
    Completed(CycleReport),
    Failed(PollError),
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Completed(_))
    }
}

pub struct Poller {
    source: Arc<dyn NotificationSource>,
    watermarks: Arc<WatermarkStore>,
    formatter: Formatter,
    dispatcher: Arc<Dispatcher>,
}

impl Poller {
    pub fn new(
        source: Arc<dyn NotificationSource>,
        watermarks: Arc<WatermarkStore>,
        formatter: Formatter,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            source,
            watermarks,
            formatter,
            dispatcher,
        }
    }

    pub fn watermarks(&self) -> &Arc<WatermarkStore> {
        &self.watermarks
    }

    /// Run one cycle for `account`. Never panics on remote or storage failures.
    pub async fn run_cycle(&self, account: &Account) -> CycleOutcome {
        let span = tracing::info_span!(
            "cycle",
            account = %account.key(),
            schedule_id = account.schedule_id
        );

        async {
            match self.try_cycle(account).await {
                Ok(report) => {
                    tracing::info!(
                        fetched = report.fetched,
                        unseen = report.unseen,
                        delivered = report.delivered,
                        suppressed = report.suppressed,
                        watermark = %report.watermark.to_iso8601(),
                        "Cycle completed"
                    );
                    CycleOutcome::Completed(report)
                }
                Err(e) => {
                    tracing::warn!(
                        status = e.status_code(),
                        "Cycle failed, watermark unchanged: {}",
                        e
                    );
                    CycleOutcome::Failed(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn try_cycle(&self, account: &Account) -> Result<CycleReport, PollError> {
        let key = account.key();

        // The lock spans read -> fetch -> write so two cycles for the same
        // account can never both act on the old cursor.
        let guard = self.watermarks.lock(&key).await;
        let current = guard.get()?;

        let events = self.source.fetch(account).await?;
        let fetched = events.len();

        let selection = select_unseen(events, &current)?;
        let unseen = selection.unseen.len();

        let messages: Vec<String> = selection
            .unseen
            .iter()
            .filter_map(|event| {
                let text = self.formatter.format(event);
                if text.is_none() {
                    tracing::debug!(event_type = %event.event_type, "Suppressed notification");
                }
                text
            })
            .collect();
        let suppressed = unseen - messages.len();

        // Commit before dispatching: a failed write means nothing is shown and
        // the same events qualify again next cycle.
        if guard.advance(&selection.watermark)? {
            tracing::debug!(watermark = %selection.watermark.to_iso8601(), "Watermark advanced");
        }
        drop(guard);

        let delivered = messages
            .into_iter()
            .filter_map(|text| self.dispatcher.dispatch(&key, text))
            .count();

        Ok(CycleReport {
            fetched,
            unseen,
            delivered,
            suppressed,
            watermark: selection.watermark,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{Alert, ChannelAlertSink};
    use crate::models::{parse_timestamp, RawEvent, RawUser};
    use crate::store::{StoreError, WatermarkBackend};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::mpsc::{self, Receiver};

    /// Serves queued responses in order, then empty pages
    struct ScriptedSource {
        responses: Mutex<Vec<Result<Vec<RawEvent>, PollError>>>,
    }

    impl ScriptedSource {
        fn new(mut responses: Vec<Result<Vec<RawEvent>, PollError>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl NotificationSource for ScriptedSource {
        async fn fetch(&self, _account: &Account) -> Result<Vec<RawEvent>, PollError> {
            self.responses.lock().pop().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    struct ReadOnlyBackend;

    impl WatermarkBackend for ReadOnlyBackend {
        fn load(&self, _account_key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }
        fn save(&self, _account_key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("read-only")))
        }
        fn remove(&self, _account_key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn event(event_type: &str, name: &str, reaction: Option<&str>, created_at: &str) -> RawEvent {
        RawEvent {
            event_type: event_type.to_string(),
            created_at: created_at.to_string(),
            user: Some(RawUser {
                name: Some(name.to_string()),
                username: None,
            }),
            reaction: reaction.map(String::from),
        }
    }

    fn poller_with(
        source: ScriptedSource,
        watermarks: Arc<WatermarkStore>,
    ) -> (Poller, Receiver<Alert>) {
        let (tx, rx) = mpsc::channel();
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(ChannelAlertSink::new(tx)),
            "Flosskey Notifications",
        ));
        let poller = Poller::new(
            Arc::new(source),
            watermarks,
            Formatter::default(),
            dispatcher,
        );
        (poller, rx)
    }

    async fn stored(watermarks: &WatermarkStore, account: &Account) -> Watermark {
        watermarks.lock(&account.key()).await.get().unwrap()
    }

    fn account() -> Account {
        Account::new("misskey.io", "token", 1)
    }

    #[tokio::test]
    async fn test_first_follow_is_dispatched() {
        let watermarks = Arc::new(WatermarkStore::in_memory());
        let source = ScriptedSource::new(vec![Ok(vec![event(
            "follow",
            "Alice",
            None,
            "2024-01-02T00:00:00Z",
        )])]);
        let (poller, rx) = poller_with(source, watermarks.clone());

        let outcome = poller.run_cycle(&account()).await;

        assert!(outcome.is_success());
        let alerts: Vec<Alert> = rx.try_iter().collect();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].body, "Alice followed you");
        assert_eq!(alerts[0].title, "Flosskey Notifications");
        assert_eq!(
            stored(&watermarks, &account()).await.to_iso8601(),
            "2024-01-02T00:00:00.000Z"
        );
    }

    #[tokio::test]
    async fn test_unknown_type_is_suppressed_but_counted() {
        let watermarks = Arc::new(WatermarkStore::in_memory());
        {
            let guard = watermarks.lock(&account().key()).await;
            guard
                .advance(&Watermark::new(
                    account().key(),
                    parse_timestamp("2023-12-31T00:00:00Z").unwrap(),
                ))
                .unwrap();
        }
        let source = ScriptedSource::new(vec![Ok(vec![
            event("reaction", "Bob", Some("👍"), "2024-01-02T00:00:00Z"),
            event("unknownType", "Eve", None, "2024-01-01T00:00:00Z"),
        ])]);
        let (poller, rx) = poller_with(source, watermarks.clone());

        let outcome = poller.run_cycle(&account()).await;

        match outcome {
            CycleOutcome::Completed(report) => {
                assert_eq!(report.fetched, 2);
                assert_eq!(report.unseen, 2);
                assert_eq!(report.delivered, 1);
                assert_eq!(report.suppressed, 1);
            }
            CycleOutcome::Failed(e) => panic!("cycle failed: {}", e),
        }
        let bodies: Vec<String> = rx.try_iter().map(|a| a.body).collect();
        assert_eq!(bodies, vec!["Bob reacted with 👍".to_string()]);
        assert_eq!(
            stored(&watermarks, &account()).await.to_iso8601(),
            "2024-01-02T00:00:00.000Z"
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_watermark() {
        let watermarks = Arc::new(WatermarkStore::in_memory());
        let source = ScriptedSource::new(vec![Err(PollError::Fetch { status_code: 500 })]);
        let (poller, rx) = poller_with(source, watermarks.clone());

        let outcome = poller.run_cycle(&account()).await;

        assert!(matches!(
            outcome,
            CycleOutcome::Failed(PollError::Fetch { status_code: 500 })
        ));
        assert_eq!(rx.try_iter().count(), 0);
        assert!(stored(&watermarks, &account()).await.is_sentinel());
    }

    #[tokio::test]
    async fn test_malformed_timestamp_keeps_watermark() {
        let watermarks = Arc::new(WatermarkStore::in_memory());
        let source = ScriptedSource::new(vec![Ok(vec![event(
            "follow",
            "Alice",
            None,
            "garbage",
        )])]);
        let (poller, rx) = poller_with(source, watermarks.clone());

        let outcome = poller.run_cycle(&account()).await;

        assert!(matches!(
            outcome,
            CycleOutcome::Failed(PollError::MalformedTimestamp { .. })
        ));
        assert_eq!(rx.try_iter().count(), 0);
        assert!(stored(&watermarks, &account()).await.is_sentinel());
    }

    #[tokio::test]
    async fn test_repeat_cycle_does_not_redispatch() {
        let watermarks = Arc::new(WatermarkStore::in_memory());
        let page = vec![
            event("mention", "Bob", None, "2024-01-02T00:00:00Z"),
            event("follow", "Alice", None, "2024-01-01T00:00:00Z"),
        ];
        let source = ScriptedSource::new(vec![Ok(page.clone()), Ok(page)]);
        let (poller, rx) = poller_with(source, watermarks);

        poller.run_cycle(&account()).await;
        poller.run_cycle(&account()).await;

        let bodies: Vec<String> = rx.try_iter().map(|a| a.body).collect();
        assert_eq!(
            bodies,
            vec![
                "Alice followed you".to_string(),
                "Bob mentioned you".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_submillisecond_timestamp_is_dispatched_once() {
        let watermarks = Arc::new(WatermarkStore::in_memory());
        let page = vec![event("follow", "Alice", None, "2024-01-02T00:00:00.123456Z")];
        let source = ScriptedSource::new(vec![Ok(page.clone()), Ok(page.clone()), Ok(page)]);
        let (poller, rx) = poller_with(source, watermarks.clone());

        for _ in 0..3 {
            assert!(poller.run_cycle(&account()).await.is_success());
        }

        assert_eq!(rx.try_iter().count(), 1);
        assert_eq!(
            stored(&watermarks, &account()).await.to_iso8601(),
            "2024-01-02T00:00:00.123456Z"
        );
    }

    #[tokio::test]
    async fn test_storage_failure_dispatches_nothing() {
        let watermarks = Arc::new(WatermarkStore::new(ReadOnlyBackend));
        let source = ScriptedSource::new(vec![Ok(vec![event(
            "follow",
            "Alice",
            None,
            "2024-01-02T00:00:00Z",
        )])]);
        let (poller, rx) = poller_with(source, watermarks);

        let outcome = poller.run_cycle(&account()).await;

        assert!(matches!(outcome, CycleOutcome::Failed(PollError::Storage(_))));
        assert_eq!(rx.try_iter().count(), 0);
    }
}
