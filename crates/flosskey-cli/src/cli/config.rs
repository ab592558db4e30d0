use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use flosskey_core::constants::DEFAULT_INSTANCE;
use flosskey_core::{AccountEntry, AccountRegistry, CoreConfig, Locale};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.json";

/// CLI configuration loaded from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    /// Where the watermark database lives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Instance for account entries that do not name one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_instance: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_cycles: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_backoff_factor: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_on_register: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<Locale>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_title: Option<String>,

    /// Look up missing access tokens in the OS keyring (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_keyring: Option<bool>,

    #[serde(default)]
    pub accounts: Vec<AccountEntry>,
}

impl CliConfig {
    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CliConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// `~/.flosskey/config.json`
    pub fn default_path() -> PathBuf {
        CoreConfig::default_data_dir().join(CONFIG_FILE)
    }

    /// Core tunables with every override applied
    pub fn core_config(&self) -> Result<CoreConfig> {
        let mut core = CoreConfig::new(
            self.data_dir
                .clone()
                .unwrap_or_else(CoreConfig::default_data_dir),
        );

        if let Some(secs) = self.interval_secs {
            anyhow::ensure!(secs > 0, "intervalSecs must be greater than zero");
            core.base_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.fetch_timeout_secs {
            anyhow::ensure!(secs > 0, "fetchTimeoutSecs must be greater than zero");
            core.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(page_size) = self.page_size {
            anyhow::ensure!(page_size > 0, "pageSize must be greater than zero");
            core.page_size = page_size;
        }
        if let Some(max) = self.max_concurrent_cycles {
            anyhow::ensure!(max > 0, "maxConcurrentCycles must be greater than zero");
            core.max_concurrent_cycles = max;
        }
        if let Some(factor) = self.max_backoff_factor {
            core.max_backoff_factor = factor.max(1);
        }
        if let Some(poll) = self.poll_on_register {
            core.poll_on_register = poll;
        }
        if let Some(locale) = self.locale {
            core.locale = locale;
        }
        if let Some(ref title) = self.alert_title {
            core.alert_title = title.clone();
        }

        Ok(core)
    }

    pub fn registry(&self) -> AccountRegistry {
        AccountRegistry::new(self.accounts.clone())
            .with_default_instance(
                self.default_instance
                    .clone()
                    .unwrap_or_else(|| DEFAULT_INSTANCE.to_string()),
            )
            .with_keyring(self.use_keyring.unwrap_or(true))
    }
}
