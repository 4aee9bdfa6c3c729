//! services/api/src/sweeper.rs
//!
//! The background task that purges long-expired quiz sessions and fires due reminders.

use chrono::Duration as ChronoDuration;
use exam_prep_core::{Clock, ReminderScheduler, StoreService};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Expired sessions are kept this long so late answers report `SessionExpired`
/// rather than `SessionNotFound`.
pub const SESSION_PURGE_GRACE_MINUTES: i64 = 60;

/// Counts from one pass of the sweeper.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub sessions_purged: u64,
    pub reminders_fired: usize,
}

#[derive(Clone)]
pub struct Sweeper {
    store: Arc<dyn StoreService>,
    reminders: ReminderScheduler,
    clock: Clock,
}

impl Sweeper {
    pub fn new(store: Arc<dyn StoreService>, reminders: ReminderScheduler, clock: Clock) -> Self {
        Self {
            store,
            reminders,
            clock,
        }
    }

    /// Runs a single pass. Errors are logged and the pass carries on.
    pub async fn sweep_once(&self) -> SweepReport {
        let mut report = SweepReport::default();

        let cutoff = self.clock.now() - ChronoDuration::minutes(SESSION_PURGE_GRACE_MINUTES);
        match self.store.purge_sessions_expired_before(cutoff).await {
            Ok(purged) => report.sessions_purged = purged,
            Err(e) => error!("Failed to purge expired sessions: {:?}", e),
        }

        match self.reminders.fire_due().await {
            Ok(fired) => {
                for reminder in &fired {
                    info!(
                        reminder_id = reminder.id,
                        user_id = %reminder.user_id,
                        fire_at = %reminder.fire_at,
                        "Reminder due: {}",
                        reminder.message
                    );
                }
                report.reminders_fired = fired.len();
            }
            Err(e) => error!("Failed to fire due reminders: {:?}", e),
        }

        if report != SweepReport::default() {
            debug!(?report, "Sweep finished");
        }
        report
    }

    /// Sweeps every `interval` until `token` is cancelled.
    pub async fn run(self, interval: Duration, token: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_secs = interval.as_secs(), "Sweeper started");
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
            }
        }
    }
}
