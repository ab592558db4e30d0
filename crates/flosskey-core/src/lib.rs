//! Background notification poller for Misskey accounts.
//!
//! For every registered account a schedule periodically fetches the
//! notifications page, keeps only what is newer than the account's stored
//! watermark, turns it into alert text and hands it to an [`AlertSink`].

pub mod config;
pub mod constants;
pub mod dedup;
pub mod dispatcher;
pub mod error;
pub mod fetcher;
pub mod formatter;
pub mod models;
pub mod poller;
pub mod registry;
pub mod runtime;
pub mod scheduler;
pub mod secure_storage;
pub mod store;
pub mod tracing_setup;

pub use config::CoreConfig;
pub use dispatcher::{Alert, AlertSink, Dispatcher};
pub use error::PollError;
pub use fetcher::{NotificationFetcher, NotificationSource};
pub use formatter::{Formatter, Locale};
pub use models::{Account, RawEvent, Watermark};
pub use poller::{CycleOutcome, CycleReport, Poller};
pub use registry::{AccountEntry, AccountRegistry};
pub use runtime::CoreRuntime;
pub use scheduler::{ScheduleCoordinator, ScheduleStatus, TriggerState};
pub use store::WatermarkStore;
