pub mod account;
pub mod notification;
pub mod watermark;

pub use account::{account_key, Account};
pub use notification::{NotificationKind, RawEvent, RawUser};
pub use watermark::{format_timestamp, parse_timestamp, sentinel_time, Watermark};
