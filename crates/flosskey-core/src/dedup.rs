//! Deduplication against the stored watermark.
//!
//! The remote feed is newest-first and chronologically monotonic, so the
//! unseen events are exactly the leading run of events newer than the
//! watermark. The scan stops at the first event that is not newer.

use crate::error::PollError;
use crate::models::{parse_timestamp, RawEvent, Watermark};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Unseen events, oldest-first (dispatch order)
    pub unseen: Vec<RawEvent>,
    /// Cursor to persist once the cycle succeeds
    pub watermark: Watermark,
}

/// Split a newest-first page into unseen events and the advanced watermark.
///
/// The new watermark is the `createdAt` of the head event whether or not that
/// event produces an alert, so an unsupported head type never blocks later
/// detection. It never moves backwards.
pub fn select_unseen(mut events: Vec<RawEvent>, watermark: &Watermark) -> Result<Selection, PollError> {
    let Some(head) = events.first() else {
        return Ok(Selection {
            unseen: Vec::new(),
            watermark: watermark.clone(),
        });
    };
    let head_at = parse_timestamp(&head.created_at)?;

    let mut fresh = 0;
    for event in &events {
        if parse_timestamp(&event.created_at)? > watermark.last_seen_at {
            fresh += 1;
        } else {
            break;
        }
    }

    events.truncate(fresh);
    events.reverse();

    Ok(Selection {
        unseen: events,
        watermark: Watermark::new(
            watermark.account_key.clone(),
            head_at.max(watermark.last_seen_at),
        ),
    })
}
