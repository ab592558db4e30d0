//! Application-wide constants
//!
//! Centralized location for remote API paths, timing defaults and the
//! bootstrap cursor shared by the fetcher, the watermark store and the
//! scheduler.

use std::time::Duration;

/// Instance used when an account entry does not name one
pub const DEFAULT_INSTANCE: &str = "misskey.io";

/// Notifications endpoint, relative to the instance base URL
pub const NOTIFICATIONS_PATH: &str = "/api/i/notifications";

/// Number of notifications requested per cycle.
/// Anything beyond the page is picked up by a later cycle.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Base polling interval per account
pub const DEFAULT_BASE_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Upper bound on a single notifications request
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Number of cycles allowed to run at the same time across all accounts
pub const DEFAULT_MAX_CONCURRENT_CYCLES: usize = 4;

/// Cursor stored for an account that has never completed a cycle.
/// Everything fetched on the first run is newer than this.
pub const WATERMARK_SENTINEL: &str = "2000-01-01T00:00:00.000Z";

/// Title shown on every delivered alert
pub const DEFAULT_ALERT_TITLE: &str = "Flosskey Notifications";

/// Keyring service under which account credentials are stored
pub const KEYRING_SERVICE: &str = "tokyo.leadershouse.flosskey";

/// File name of the SQLite watermark database inside the data dir
pub const WATERMARK_DB_FILE: &str = "watermarks.db";
