use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    DEFAULT_ALERT_TITLE, DEFAULT_BASE_INTERVAL, DEFAULT_FETCH_TIMEOUT,
    DEFAULT_MAX_CONCURRENT_CYCLES, DEFAULT_PAGE_SIZE, WATERMARK_DB_FILE,
};
use crate::formatter::Locale;

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    /// Delay between the end of one cycle and the next firing for the same account
    pub base_interval: Duration,
    pub fetch_timeout: Duration,
    pub page_size: u32,
    /// Size of the worker pool shared by all accounts
    pub max_concurrent_cycles: usize,
    /// Cap on the failure backoff multiplier. 1 keeps every delay at `base_interval`.
    pub max_backoff_factor: u32,
    /// Fire each account once right after registration instead of waiting a full interval
    pub poll_on_register: bool,
    pub locale: Locale,
    pub alert_title: String,
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            base_interval: DEFAULT_BASE_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
            max_concurrent_cycles: DEFAULT_MAX_CONCURRENT_CYCLES,
            max_backoff_factor: 1,
            poll_on_register: false,
            locale: Locale::default(),
            alert_title: DEFAULT_ALERT_TITLE.to_string(),
        }
    }

    /// `~/.flosskey`, or `./flosskey_data` when no home directory is available
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .map(|home| home.join(".flosskey"))
            .unwrap_or_else(|| PathBuf::from("flosskey_data"))
    }

    pub fn watermark_db_path(&self) -> PathBuf {
        self.data_dir.join(WATERMARK_DB_FILE)
    }

    /// Delay before the next firing after `consecutive_failures` failed cycles in a row.
    pub fn next_delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 || self.max_backoff_factor <= 1 {
            return self.base_interval;
        }
        let exponent = (consecutive_failures - 1).min(31);
        let factor = 2u32.saturating_pow(exponent).min(self.max_backoff_factor);
        self.base_interval.saturating_mul(factor)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new(Self::default_data_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::new("/tmp/flosskey");
        assert_eq!(config.base_interval, Duration::from_secs(900));
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.page_size, 100);
        assert_eq!(
            config.watermark_db_path(),
            PathBuf::from("/tmp/flosskey/watermarks.db")
        );
    }

    #[test]
    fn test_next_delay_without_backoff() {
        let config = CoreConfig::new("/tmp/flosskey");
        assert_eq!(config.next_delay(0), config.base_interval);
        assert_eq!(config.next_delay(5), config.base_interval);
    }

    #[test]
    fn test_next_delay_with_backoff() {
        let mut config = CoreConfig::new("/tmp/flosskey");
        config.base_interval = Duration::from_secs(60);
        config.max_backoff_factor = 8;

        assert_eq!(config.next_delay(0), Duration::from_secs(60));
        // First failure still re-arms at the base interval
        assert_eq!(config.next_delay(1), Duration::from_secs(60));
        assert_eq!(config.next_delay(2), Duration::from_secs(120));
        assert_eq!(config.next_delay(3), Duration::from_secs(240));
        assert_eq!(config.next_delay(4), Duration::from_secs(480));
        assert_eq!(config.next_delay(40), Duration::from_secs(480));
    }
}
