use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::PollError;

/// Unix seconds of `constants::WATERMARK_SENTINEL`
const SENTINEL_UNIX_SECS: i64 = 946_684_800;

/// Per-account "last seen" cursor.
///
/// Events created at or before `last_seen_at` have already been notified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watermark {
    pub account_key: String,
    pub last_seen_at: DateTime<Utc>,
}

impl Watermark {
    pub fn new(account_key: impl Into<String>, last_seen_at: DateTime<Utc>) -> Self {
        Self {
            account_key: account_key.into(),
            last_seen_at,
        }
    }

    /// Cursor for an account with nothing seen yet
    pub fn sentinel(account_key: impl Into<String>) -> Self {
        Self::new(account_key, sentinel_time())
    }

    pub fn is_sentinel(&self) -> bool {
        self.last_seen_at == sentinel_time()
    }

    /// ISO-8601 form used for persistence
    pub fn to_iso8601(&self) -> String {
        format_timestamp(&self.last_seen_at)
    }
}

pub fn sentinel_time() -> DateTime<Utc> {
    DateTime::from_timestamp(SENTINEL_UNIX_SECS, 0).unwrap_or_default()
}

/// Parse an ISO-8601 / RFC 3339 timestamp as sent by the API
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, PollError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| PollError::MalformedTimestamp {
            value: value.to_string(),
        })
}

/// Millisecond form unless the value carries finer digits, which are kept
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    let nanos = at.timestamp_subsec_nanos();
    let precision = if nanos % 1_000_000 == 0 {
        SecondsFormat::Millis
    } else if nanos % 1_000 == 0 {
        SecondsFormat::Micros
    } else {
        SecondsFormat::Nanos
    };
    at.to_rfc3339_opts(precision, true)
}
