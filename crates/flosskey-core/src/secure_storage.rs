/// Secure storage for account access tokens
///
/// Uses OS-backed secure storage:
/// - macOS/iOS: Keychain
/// - Linux: Secret Service API (gnome-keyring, KWallet, etc.)
/// - Windows: Credential Manager
///
/// Entries are keyed by the account key (`instance#schedule_id`) so two
/// accounts on the same instance never share a token.
use keyring::Entry;

use crate::constants::KEYRING_SERVICE;
use crate::models::account_key;

#[derive(Debug, thiserror::Error)]
pub enum SecureStorageError {
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("No access token stored for {0}")]
    TokenNotFound(String),

    #[error("Keyring did not keep the token for {0}; no persistent credential store is available")]
    NotPersisted(String),
}

pub struct SecureStorage;

impl SecureStorage {
    fn entry(instance: &str, schedule_id: u32) -> Result<Entry, SecureStorageError> {
        Ok(Entry::new(KEYRING_SERVICE, &account_key(instance, schedule_id))?)
    }

    /// Store an account's access token.
    ///
    /// The token is read back through a fresh entry, so a store that keeps
    /// nothing between entries is reported instead of silently accepted.
    pub fn set_access_token(
        instance: &str,
        schedule_id: u32,
        token: &str,
    ) -> Result<(), SecureStorageError> {
        Self::entry(instance, schedule_id)?.set_password(token)?;

        match Self::entry(instance, schedule_id)?.get_password() {
            Ok(stored) if stored == token => Ok(()),
            Ok(_) | Err(keyring::Error::NoEntry) => Err(SecureStorageError::NotPersisted(
                account_key(instance, schedule_id),
            )),
            Err(e) => Err(SecureStorageError::Keyring(e)),
        }
    }

    /// Retrieve an account's access token
    pub fn get_access_token(instance: &str, schedule_id: u32) -> Result<String, SecureStorageError> {
        match Self::entry(instance, schedule_id)?.get_password() {
            Ok(value) => Ok(value),
            Err(keyring::Error::NoEntry) => Err(SecureStorageError::TokenNotFound(account_key(
                instance,
                schedule_id,
            ))),
            Err(e) => Err(SecureStorageError::Keyring(e)),
        }
    }

    /// Delete an account's access token
    pub fn delete_access_token(instance: &str, schedule_id: u32) -> Result<(), SecureStorageError> {
        match Self::entry(instance, schedule_id)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // Already deleted is success
            Err(e) => Err(SecureStorageError::Keyring(e)),
        }
    }
}
