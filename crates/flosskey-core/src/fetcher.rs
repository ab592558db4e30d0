use std::time::Duration;

use async_trait::async_trait;

use crate::config::CoreConfig;
use crate::error::PollError;
use crate::models::{Account, RawEvent};

/// Where a cycle gets its notifications from.
///
/// Returns one page ordered newest-first. Implementations never retry; the
/// next scheduled cycle is the retry.
#[async_trait]
pub trait NotificationSource: Send + Sync {
    async fn fetch(&self, account: &Account) -> Result<Vec<RawEvent>, PollError>;
}

/// HTTP client for the `i/notifications` endpoint
pub struct NotificationFetcher {
    client: reqwest::Client,
    page_size: u32,
}

impl NotificationFetcher {
    pub fn new(timeout: Duration, page_size: u32) -> Result<Self, PollError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, page_size })
    }

    pub fn from_config(config: &CoreConfig) -> Result<Self, PollError> {
        Self::new(config.fetch_timeout, config.page_size)
    }
}

#[async_trait]
impl NotificationSource for NotificationFetcher {
    async fn fetch(&self, account: &Account) -> Result<Vec<RawEvent>, PollError> {
        let body = serde_json::json!({
            "i": account.access_token,
            "limit": self.page_size,
        });

        let response = self
            .client
            .post(account.notifications_url())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::debug!(
                status = status.as_u16(),
                "Notification request rejected: {}",
                error_text
            );
            return Err(PollError::Fetch {
                status_code: status.as_u16(),
            });
        }

        let text = response.text().await?;
        parse_events(&text)
    }
}

/// Parse a success body into events, keeping the server's order
pub fn parse_events(body: &str) -> Result<Vec<RawEvent>, PollError> {
    if body.trim().is_empty() {
        return Err(PollError::Parse("empty response body".to_string()));
    }

    serde_json::from_str::<Vec<RawEvent>>(body)
        .map_err(|e| PollError::Parse(format!("expected an array of notifications: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_events_keeps_order() {
        let body = r#"[
            {"type": "follow", "createdAt": "2024-01-03T00:00:00Z", "user": {"name": "Alice"}},
            {"type": "mention", "createdAt": "2024-01-02T00:00:00Z", "user": {"name": "Bob"}}
        ]"#;
        let events = parse_events(body).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "follow");
        assert_eq!(events[1].event_type, "mention");
    }

    #[test]
    fn test_parse_events_empty_array() {
        assert!(parse_events("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_events_rejects_blank_body() {
        assert!(matches!(parse_events("  \n"), Err(PollError::Parse(_))));
    }

    #[test]
    fn test_parse_events_rejects_non_array() {
        assert!(matches!(
            parse_events(r#"{"error": {"message": "denied"}}"#),
            Err(PollError::Parse(_))
        ));
        assert!(matches!(parse_events("<html>"), Err(PollError::Parse(_))));
    }

    #[test]
    fn test_parse_events_requires_created_at() {
        assert!(matches!(
            parse_events(r#"[{"type": "follow"}]"#),
            Err(PollError::Parse(_))
        ));
    }
}
