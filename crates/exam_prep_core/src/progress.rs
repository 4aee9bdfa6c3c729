//! crates/exam_prep_core/src/progress.rs
//!
//! Read-only progress reporting. Never fails for a user it has not seen.

use std::sync::Arc;

use crate::domain::{ProgressRecord, ProgressReport};
use crate::error::ToolResult;
use crate::ports::StoreService;
use crate::settings::QuizSettings;
use crate::time::{calendar_day, Clock};

#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn StoreService>,
    clock: Clock,
    settings: QuizSettings,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn StoreService>, clock: Clock, settings: QuizSettings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    pub async fn get_progress(&self, user_id: &str) -> ToolResult<ProgressReport> {
        let record = self
            .store
            .get_progress(user_id)
            .await?
            .unwrap_or_else(|| ProgressRecord::empty(user_id));
        let topics = self.store.get_topic_progress(user_id).await?;
        let today = calendar_day(self.clock.now(), self.settings.day_offset);

        Ok(ProgressReport {
            user_id: record.user_id.clone(),
            correct_count: record.correct_count,
            total_count: record.total_count,
            accuracy: record.accuracy(),
            current_streak: record.streak_on(today),
            last_activity_date: record.last_activity_date,
            topics,
        })
    }
}
