//! crates/exam_prep_core/src/grading.rs
//!
//! Answer checking against a stored quiz session.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::AnswerOutcome;
use crate::error::{ToolError, ToolResult};
use crate::ports::StoreService;
use crate::settings::QuizSettings;
use crate::time::{calendar_day, Clock};

#[derive(Clone)]
pub struct AnswerChecker {
    store: Arc<dyn StoreService>,
    clock: Clock,
    settings: QuizSettings,
}

impl AnswerChecker {
    pub fn new(store: Arc<dyn StoreService>, clock: Clock, settings: QuizSettings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    /// Grades one answer and records it against the session owner's progress.
    ///
    /// Every call counts, including repeat submissions for the same question.
    /// A wrong answer is a normal outcome, not an error.
    pub async fn check_answer(
        &self,
        session_id: Uuid,
        question_index: usize,
        chosen_choice_index: usize,
    ) -> ToolResult<AnswerOutcome> {
        let now = self.clock.now();
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or(ToolError::SessionNotFound(session_id))?;
        if session.is_expired(now) {
            return Err(ToolError::SessionExpired(session_id));
        }

        let question_id = *session
            .question_ids
            .get(question_index)
            .ok_or(ToolError::IndexOutOfRange {
                index: question_index,
                len: session.question_ids.len(),
            })?;
        let question = self.store.get_question(question_id).await?.ok_or_else(|| {
            warn!(%session_id, question_id, "Session references a missing question");
            ToolError::StoreUnavailable(format!(
                "question {question_id} referenced by session {session_id} is missing"
            ))
        })?;

        let correct = chosen_choice_index == question.correct_choice_index;
        let today = calendar_day(now, self.settings.day_offset);
        let progress = self
            .store
            .record_answer(&session.user_id, &question.topic, correct, today)
            .await?;
        info!(
            %session_id,
            user_id = %session.user_id,
            question_index,
            correct,
            streak = progress.current_streak,
            "Answer graded"
        );

        Ok(AnswerOutcome {
            correct,
            correct_choice_index: question.correct_choice_index,
            explanation: question.explanation,
            current_streak: progress.current_streak,
        })
    }
}
