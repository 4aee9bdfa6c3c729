//! crates/exam_prep_core/src/reminders.rs
//!
//! Study reminders. Turning free text into a timestamp is delegated to the
//! injected `TimeParsingService`; the scheduler only validates and stores.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{NewReminder, Reminder};
use crate::error::{ToolError, ToolResult};
use crate::ports::{PortError, StoreService, TimeParsingService};
use crate::time::Clock;

#[derive(Clone)]
pub struct ReminderScheduler {
    store: Arc<dyn StoreService>,
    parser: Arc<dyn TimeParsingService>,
    clock: Clock,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn StoreService>,
        parser: Arc<dyn TimeParsingService>,
        clock: Clock,
    ) -> Self {
        Self {
            store,
            parser,
            clock,
        }
    }

    pub async fn set_reminder(
        &self,
        user_id: &str,
        when: &str,
        message: &str,
    ) -> ToolResult<Reminder> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ToolError::InvalidArgument(
                "reminder message must not be empty".to_string(),
            ));
        }

        let now = self.clock.now();
        let fire_at = self.parser.parse_time(when, now).await.map_err(|e| {
            warn!(when, error = %e, "Could not parse reminder time");
            match e {
                PortError::Unexpected(msg) | PortError::NotFound(msg) => ToolError::TimeParse(msg),
                PortError::Unauthorized => {
                    ToolError::TimeParse("time parser rejected our credentials".to_string())
                }
            }
        })?;
        if fire_at <= now {
            return Err(ToolError::InvalidArgument(format!(
                "reminder time {} is not in the future",
                fire_at.to_rfc3339()
            )));
        }

        let reminder = self
            .store
            .insert_reminder(NewReminder {
                user_id: user_id.to_string(),
                message: message.to_string(),
                fire_at,
                created_at: now,
            })
            .await?;
        info!(reminder_id = reminder.id, %user_id, fire_at = %reminder.fire_at, "Reminder scheduled");
        Ok(reminder)
    }

    pub async fn list_reminders(&self, user_id: &str) -> ToolResult<Vec<Reminder>> {
        Ok(self.store.list_reminders(user_id).await?)
    }

    pub async fn cancel_reminder(&self, user_id: &str, reminder_id: i64) -> ToolResult<()> {
        if self.store.cancel_reminder(user_id, reminder_id).await? {
            info!(reminder_id, %user_id, "Reminder cancelled");
            Ok(())
        } else {
            Err(ToolError::ReminderNotFound(reminder_id))
        }
    }

    /// Marks every reminder that is due as fired and returns them.
    pub async fn fire_due(&self) -> ToolResult<Vec<Reminder>> {
        Ok(self.store.fire_due_reminders(self.clock.now()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ReminderStatus;
    use crate::memory::InMemoryStore;
    use crate::ports::PortResult;
    use crate::time::fixed_now;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};

    /// Understands "in N hours" and nothing else.
    struct HoursParser;

    #[async_trait]
    impl TimeParsingService for HoursParser {
        async fn parse_time(&self, text: &str, now: DateTime<Utc>) -> PortResult<DateTime<Utc>> {
            let hours: i64 = text
                .strip_prefix("in ")
                .and_then(|rest| rest.strip_suffix(" hours"))
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| PortError::Unexpected(format!("cannot parse '{text}'")))?;
            Ok(now + Duration::hours(hours))
        }
    }

    fn scheduler(store: &InMemoryStore, clock: Clock) -> ReminderScheduler {
        ReminderScheduler::new(Arc::new(store.clone()), Arc::new(HoursParser), clock)
    }

    #[tokio::test]
    async fn schedules_and_lists_in_fire_order() {
        let store = InMemoryStore::new();
        let scheduler = scheduler(&store, Clock::fixed(fixed_now()));

        scheduler.set_reminder("u1", "in 5 hours", "Revise optics").await.unwrap();
        scheduler.set_reminder("u1", "in 2 hours", "Solve calculus set").await.unwrap();
        scheduler.set_reminder("u2", "in 1 hours", "Not mine").await.unwrap();

        let listed = scheduler.list_reminders("u1").await.unwrap();
        let messages: Vec<&str> = listed.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["Solve calculus set", "Revise optics"]);
        assert!(listed.iter().all(|r| r.status == ReminderStatus::Pending));
        assert_eq!(listed[0].fire_at, fixed_now() + Duration::hours(2));
    }

    #[tokio::test]
    async fn unparseable_time_is_reported() {
        let store = InMemoryStore::new();
        let err = scheduler(&store, Clock::fixed(fixed_now()))
            .set_reminder("u1", "whenever", "Revise")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::TimeParse(_)));
    }

    #[tokio::test]
    async fn past_time_and_empty_message_are_rejected() {
        let store = InMemoryStore::new();
        let scheduler = scheduler(&store, Clock::fixed(fixed_now()));

        let err = scheduler.set_reminder("u1", "in -1 hours", "Revise").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
        let err = scheduler.set_reminder("u1", "in 1 hours", "   ").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
        assert!(scheduler.list_reminders("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_owner_can_cancel_pending_reminder() {
        let store = InMemoryStore::new();
        let scheduler = scheduler(&store, Clock::fixed(fixed_now()));
        let reminder = scheduler.set_reminder("u1", "in 1 hours", "Revise").await.unwrap();

        let err = scheduler.cancel_reminder("u2", reminder.id).await.unwrap_err();
        assert!(matches!(err, ToolError::ReminderNotFound(id) if id == reminder.id));

        scheduler.cancel_reminder("u1", reminder.id).await.unwrap();
        let listed = scheduler.list_reminders("u1").await.unwrap();
        assert_eq!(listed[0].status, ReminderStatus::Cancelled);

        let err = scheduler.cancel_reminder("u1", reminder.id).await.unwrap_err();
        assert!(matches!(err, ToolError::ReminderNotFound(_)));
    }

    #[tokio::test]
    async fn due_reminders_fire_once() {
        let store = InMemoryStore::new();
        let mut clock = Clock::fixed(fixed_now());
        let scheduler_now = scheduler(&store, clock);
        scheduler_now.set_reminder("u1", "in 1 hours", "Soon").await.unwrap();
        scheduler_now.set_reminder("u1", "in 3 hours", "Later").await.unwrap();

        clock.advance(Duration::hours(2));
        let later = scheduler(&store, clock);
        let fired = later.fire_due().await.unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].message, "Soon");
        assert_eq!(fired[0].status, ReminderStatus::Fired);

        assert!(later.fire_due().await.unwrap().is_empty());
    }
}
