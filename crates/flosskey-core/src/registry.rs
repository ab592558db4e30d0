//! Account registry
//!
//! Turns the externally supplied account entries into validated [`Account`]s.
//! A bad entry is reported and skipped; it never hides the others.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::PollError;
use crate::models::Account;
use crate::secure_storage::SecureStorage;

/// One account as written in the configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    /// Inline token; when absent the token is looked up in the OS keyring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    pub schedule_id: u32,
}

/// An entry that could not become an [`Account`]
#[derive(Debug)]
pub struct SkippedEntry {
    pub schedule_id: u32,
    pub error: PollError,
}

#[derive(Debug, Clone, Default)]
pub struct AccountRegistry {
    entries: Vec<AccountEntry>,
    default_instance: Option<String>,
    use_keyring: bool,
}

impl AccountRegistry {
    pub fn new(entries: Vec<AccountEntry>) -> Self {
        Self {
            entries,
            default_instance: None,
            use_keyring: false,
        }
    }

    /// Instance used by entries that do not name one
    pub fn with_default_instance(mut self, instance: impl Into<String>) -> Self {
        self.default_instance = Some(instance.into());
        self
    }

    /// Resolve missing tokens from the OS keyring
    pub fn with_keyring(mut self, enabled: bool) -> Self {
        self.use_keyring = enabled;
        self
    }

    pub fn entries(&self) -> &[AccountEntry] {
        &self.entries
    }

    /// Valid accounts in configuration order; invalid entries are logged and skipped
    pub fn list_accounts(&self) -> Vec<Account> {
        let (accounts, skipped) = self.partition();
        for entry in skipped {
            tracing::warn!(
                schedule_id = entry.schedule_id,
                "Skipping account entry: {}",
                entry.error
            );
        }
        accounts
    }

    /// Split the entries into valid accounts and the entries that were rejected
    pub fn partition(&self) -> (Vec<Account>, Vec<SkippedEntry>) {
        let mut accounts = Vec::with_capacity(self.entries.len());
        let mut skipped = Vec::new();
        let mut seen_ids = HashSet::new();

        for entry in &self.entries {
            let resolved = self.resolve(entry).and_then(|account| {
                if seen_ids.insert(account.schedule_id) {
                    Ok(account)
                } else {
                    Err(PollError::Configuration(format!(
                        "duplicate schedule id {}",
                        account.schedule_id
                    )))
                }
            });

            match resolved {
                Ok(account) => accounts.push(account),
                Err(error) => skipped.push(SkippedEntry {
                    schedule_id: entry.schedule_id,
                    error,
                }),
            }
        }

        (accounts, skipped)
    }

    /// Validate a single entry
    pub fn resolve(&self, entry: &AccountEntry) -> Result<Account, PollError> {
        let instance = entry
            .instance
            .as_deref()
            .or(self.default_instance.as_deref())
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .ok_or_else(|| {
                PollError::Configuration(format!(
                    "schedule id {} has no instance",
                    entry.schedule_id
                ))
            })?;

        let inline_token = entry
            .access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let token = match inline_token {
            Some(token) => token,
            None if self.use_keyring => {
                SecureStorage::get_access_token(instance, entry.schedule_id)
                    .map_err(|e| PollError::Configuration(e.to_string()))?
            }
            None => {
                return Err(PollError::Configuration(format!(
                    "schedule id {} has no access token",
                    entry.schedule_id
                )))
            }
        };

        if token.trim().is_empty() {
            return Err(PollError::Configuration(format!(
                "schedule id {} has an empty access token",
                entry.schedule_id
            )));
        }

        Ok(Account::new(instance, token, entry.schedule_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(instance: Option<&str>, token: Option<&str>, schedule_id: u32) -> AccountEntry {
        AccountEntry {
            instance: instance.map(String::from),
            access_token: token.map(String::from),
            schedule_id,
        }
    }

    #[test]
    fn test_invalid_entries_are_skipped_not_fatal() {
        let registry = AccountRegistry::new(vec![
            entry(Some("misskey.io"), Some("token-1"), 1),
            entry(None, Some("token-2"), 2),
            entry(Some("misskey.io"), None, 3),
            entry(Some(""), Some("token-4"), 4),
            entry(Some("example.social"), Some("   "), 5),
            entry(Some("example.social"), Some("token-6"), 6),
        ]);

        let (accounts, skipped) = registry.partition();
        let ids: Vec<u32> = accounts.iter().map(|a| a.schedule_id).collect();
        assert_eq!(ids, vec![1, 6]);

        let skipped_ids: Vec<u32> = skipped.iter().map(|s| s.schedule_id).collect();
        assert_eq!(skipped_ids, vec![2, 3, 4, 5]);
        assert!(skipped
            .iter()
            .all(|s| matches!(s.error, PollError::Configuration(_))));
    }

    #[test]
    fn test_default_instance_fills_missing_instance() {
        let registry = AccountRegistry::new(vec![entry(None, Some("token"), 1)])
            .with_default_instance("misskey.io");

        let accounts = registry.list_accounts();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].instance, "misskey.io");
    }

    #[test]
    fn test_duplicate_schedule_id_keeps_first() {
        let registry = AccountRegistry::new(vec![
            entry(Some("a.example"), Some("token-a"), 1),
            entry(Some("b.example"), Some("token-b"), 1),
        ]);

        let (accounts, skipped) = registry.partition();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].instance, "a.example");
        assert_eq!(skipped.len(), 1);
    }

    #[test]
    fn test_entry_parses_from_camel_case_json() {
        let json = r#"{"instance": "misskey.io", "accessToken": "abc", "scheduleId": 3}"#;
        let parsed: AccountEntry = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, entry(Some("misskey.io"), Some("abc"), 3));
    }
}
