use crate::store::StoreError;

/// Everything that can end a polling cycle early.
///
/// None of these are fatal to the process: the account keeps its stored
/// watermark and is polled again at the next interval.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// Unusable account entry; only that entry is skipped
    #[error("invalid account entry: {0}")]
    Configuration(String),

    #[error("notification request failed with status {status_code}")]
    Fetch { status_code: u16 },

    /// Connection, TLS or timeout failure before any status was received
    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unusable notification response: {0}")]
    Parse(String),

    #[error("malformed timestamp: {value:?}")]
    MalformedTimestamp { value: String },

    #[error("watermark storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("polling cycle panicked: {0}")]
    CyclePanicked(String),
}

impl PollError {
    /// HTTP status carried by the failure, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PollError::Fetch { status_code } => Some(*status_code),
            PollError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
