//! Per-account schedules.
//!
//! Each registered account gets one task that sleeps for the interval, takes
//! a slot in the shared worker pool, runs a cycle and only then arms the next
//! trigger. Cycles for one account therefore never overlap, while different
//! accounts run side by side up to the pool size.
//!
//! Teardown bumps a generation counter and signals every task through its
//! `watch` channel. A task re-checks both after its cycle, so a teardown that
//! races with a re-arm always wins.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::CoreConfig;
use crate::error::PollError;
use crate::models::Account;
use crate::poller::{CycleOutcome, Poller};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    /// Waiting for the next firing or for a free pool slot
    Armed,
    /// Holds a pool slot and is running a cycle
    Firing,
}

/// Snapshot of one account's schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleStatus {
    pub schedule_id: u32,
    pub account_key: String,
    pub state: TriggerState,
    pub consecutive_failures: u32,
    pub completed_cycles: u64,
}

struct ScheduleEntry {
    status: Arc<Mutex<ScheduleStatus>>,
    cancel_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

struct Shared {
    poller: Arc<Poller>,
    config: CoreConfig,
    pool: Arc<Semaphore>,
    generation: AtomicU64,
    schedules: Mutex<HashMap<u32, ScheduleEntry>>,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

pub struct ScheduleCoordinator {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl ScheduleCoordinator {
    /// Must be called from within a Tokio runtime; schedules run on it.
    pub fn new(poller: Arc<Poller>, config: CoreConfig) -> Result<Self> {
        let runtime = Handle::try_current().context("Schedule coordinator needs a Tokio runtime")?;
        let pool = Arc::new(Semaphore::new(config.max_concurrent_cycles.max(1)));

        Ok(Self {
            shared: Arc::new(Shared {
                poller,
                config,
                pool,
                generation: AtomicU64::new(0),
                schedules: Mutex::new(HashMap::new()),
            }),
            runtime,
        })
    }

    /// Replace every schedule with one per account in `accounts`.
    ///
    /// Existing schedules are torn down first. The whole snapshot is applied
    /// under one lock, so callers never observe a half-registered set.
    /// Returns the number of schedules armed.
    pub fn register_all(&self, accounts: Vec<Account>) -> usize {
        let mut schedules = self.shared.schedules.lock();
        let retired = Self::teardown_locked(&self.shared, &mut schedules);
        if !retired.is_empty() {
            tracing::info!(count = retired.len(), "Cancelled existing schedules");
        }
        let generation = self.shared.generation.load(Ordering::SeqCst);

        for account in accounts {
            if account.instance.trim().is_empty() || account.access_token.trim().is_empty() {
                tracing::warn!(
                    schedule_id = account.schedule_id,
                    "Not scheduling account without instance or access token"
                );
                continue;
            }
            if schedules.contains_key(&account.schedule_id) {
                tracing::warn!(
                    schedule_id = account.schedule_id,
                    "Duplicate schedule id, keeping the first account"
                );
                continue;
            }

            let schedule_id = account.schedule_id;
            let status = Arc::new(Mutex::new(ScheduleStatus {
                schedule_id,
                account_key: account.key(),
                state: TriggerState::Armed,
                consecutive_failures: 0,
                completed_cycles: 0,
            }));
            let (cancel_tx, cancel_rx) = watch::channel(false);

            let span = tracing::info_span!("schedule", account = %account.key(), schedule_id);
            let handle = self.runtime.spawn(
                run_schedule(
                    self.shared.clone(),
                    account,
                    generation,
                    status.clone(),
                    cancel_rx,
                )
                .instrument(span),
            );

            schedules.insert(
                schedule_id,
                ScheduleEntry {
                    status,
                    cancel_tx,
                    handle,
                },
            );
        }

        tracing::info!(
            count = schedules.len(),
            interval_secs = self.shared.config.base_interval.as_secs(),
            "Registered schedules"
        );
        schedules.len()
    }

    /// Stop every schedule. No firing starts after this returns; a cycle
    /// already running finishes but does not re-arm.
    pub fn cancel_all(&self) {
        let mut schedules = self.shared.schedules.lock();
        let retired = Self::teardown_locked(&self.shared, &mut schedules);
        tracing::info!(count = retired.len(), "Cancelled all schedules");
    }

    /// Cancel everything and wait for in-flight cycles to finish
    pub async fn shutdown(&self) {
        let retired = {
            let mut schedules = self.shared.schedules.lock();
            Self::teardown_locked(&self.shared, &mut schedules)
        };

        for handle in retired {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::error!("Schedule task panicked during shutdown");
                }
            }
        }
    }

    pub fn schedules(&self) -> Vec<ScheduleStatus> {
        let schedules = self.shared.schedules.lock();
        let mut statuses: Vec<ScheduleStatus> =
            schedules.values().map(|e| e.status.lock().clone()).collect();
        statuses.sort_by_key(|s| s.schedule_id);
        statuses
    }

    pub fn is_registered(&self, schedule_id: u32) -> bool {
        self.shared.schedules.lock().contains_key(&schedule_id)
    }

    fn teardown_locked(
        shared: &Shared,
        schedules: &mut HashMap<u32, ScheduleEntry>,
    ) -> Vec<JoinHandle<()>> {
        shared.generation.fetch_add(1, Ordering::SeqCst);
        schedules
            .drain()
            .map(|(_, entry)| {
                // The task may already be gone; nothing to signal then
                let _ = entry.cancel_tx.send(true);
                entry.handle
            })
            .collect()
    }
}

impl Drop for ScheduleCoordinator {
    fn drop(&mut self) {
        let mut schedules = self.shared.schedules.lock();
        Self::teardown_locked(&self.shared, &mut schedules);
    }
}

async fn run_schedule(
    shared: Arc<Shared>,
    account: Account,
    generation: u64,
    status: Arc<Mutex<ScheduleStatus>>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    let mut delay = if shared.config.poll_on_register {
        Duration::ZERO
    } else {
        shared.config.base_interval
    };

    loop {
        tokio::select! {
            biased;
            _ = cancelled(&mut cancel_rx) => break,
            _ = tokio::time::sleep(delay) => {}
        }

        let permit = tokio::select! {
            biased;
            _ = cancelled(&mut cancel_rx) => break,
            permit = shared.pool.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };
        if *cancel_rx.borrow() || !shared.is_current(generation) {
            break;
        }

        status.lock().state = TriggerState::Firing;
        let outcome = AssertUnwindSafe(shared.poller.run_cycle(&account))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let message = panic_message(panic.as_ref());
                tracing::error!("Cycle panicked: {}", message);
                CycleOutcome::Failed(PollError::CyclePanicked(message))
            });
        drop(permit);

        let failures = {
            let mut status = status.lock();
            status.completed_cycles += 1;
            if outcome.is_success() {
                status.consecutive_failures = 0;
            } else {
                status.consecutive_failures += 1;
            }
            status.consecutive_failures
        };

        // Check-after-cancel: a teardown during the cycle must not be undone
        if *cancel_rx.borrow() || !shared.is_current(generation) {
            break;
        }

        delay = shared.config.next_delay(failures);
        status.lock().state = TriggerState::Armed;
        tracing::debug!(delay_secs = delay.as_secs(), "Re-armed");
    }

    tracing::debug!("Schedule stopped");
}

/// Resolves once teardown is signalled or the sender is gone
async fn cancelled(cancel_rx: &mut watch::Receiver<bool>) {
    let _ = cancel_rx.wait_for(|cancelled| *cancelled).await;
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
