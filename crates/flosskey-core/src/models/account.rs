use std::fmt;

use crate::constants::NOTIFICATIONS_PATH;

/// A remote account polled for notifications.
///
/// Immutable once built by the account registry; a changed account list is
/// applied by re-registering the whole set.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    /// Host name of the instance (`misskey.io`), or a full base URL with scheme
    pub instance: String,
    pub access_token: String,
    /// Unique per account; identifies the account's schedule
    pub schedule_id: u32,
}

impl Account {
    pub fn new(instance: impl Into<String>, access_token: impl Into<String>, schedule_id: u32) -> Self {
        Self {
            instance: instance.into(),
            access_token: access_token.into(),
            schedule_id,
        }
    }

    /// Key scoping this account's watermark and locks (`instance#schedule_id`)
    pub fn key(&self) -> String {
        account_key(&self.instance, self.schedule_id)
    }

    /// Base URL of the instance, `https://` unless a scheme was given
    pub fn base_url(&self) -> String {
        let instance = self.instance.trim().trim_end_matches('/');
        if instance.starts_with("http://") || instance.starts_with("https://") {
            instance.to_string()
        } else {
            format!("https://{}", instance)
        }
    }

    pub fn notifications_url(&self) -> String {
        format!("{}{}", self.base_url(), NOTIFICATIONS_PATH)
    }
}

/// Build the watermark key for an account without holding its credential
pub fn account_key(instance: &str, schedule_id: u32) -> String {
    format!("{}#{}", instance.trim().trim_end_matches('/'), schedule_id)
}

// Credentials stay out of logs
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("instance", &self.instance)
            .field("access_token", &"<redacted>")
            .field("schedule_id", &self.schedule_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifications_url_for_bare_host() {
        let account = Account::new("misskey.io", "token", 1);
        assert_eq!(
            account.notifications_url(),
            "https://misskey.io/api/i/notifications"
        );
    }

    #[test]
    fn test_notifications_url_keeps_explicit_scheme() {
        let account = Account::new("http://127.0.0.1:8080/", "token", 1);
        assert_eq!(
            account.notifications_url(),
            "http://127.0.0.1:8080/api/i/notifications"
        );
    }

    #[test]
    fn test_key_differs_per_account_on_same_instance() {
        let a = Account::new("misskey.io", "token-a", 1);
        let b = Account::new("misskey.io", "token-b", 2);
        assert_eq!(a.key(), "misskey.io#1");
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_debug_redacts_token() {
        let account = Account::new("misskey.io", "super-secret", 1);
        let debug = format!("{:?}", account);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
