//! crates/exam_prep_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to stay independent of the concrete database and the time-parsing provider.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{
    College, ExamInfo, Formula, NewQuestion, NewReminder, Note, ProgressRecord, Question, QuizSession,
    Reminder, TopicProgress,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait StoreService: Send + Sync {
    // --- Question Bank ---
    /// Distinct topics present in the question bank.
    async fn list_topics(&self) -> PortResult<Vec<String>>;

    /// All questions of a topic, matched case-insensitively.
    async fn questions_for_topic(&self, topic: &str) -> PortResult<Vec<Question>>;

    async fn get_question(&self, question_id: i64) -> PortResult<Option<Question>>;

    async fn insert_question(&self, question: NewQuestion) -> PortResult<Question>;

    // --- Quiz Sessions ---
    async fn insert_session(&self, session: &QuizSession) -> PortResult<()>;

    async fn get_session(&self, session_id: Uuid) -> PortResult<Option<QuizSession>>;

    /// Deletes sessions whose `expires_at` is before `cutoff`. Returns how many were removed.
    async fn purge_sessions_expired_before(&self, cutoff: DateTime<Utc>) -> PortResult<u64>;

    // --- Progress ---
    /// Applies one graded answer to the user's progress as a single indivisible update
    /// and returns the record as stored afterwards. The per-topic tally moves with it.
    async fn record_answer(
        &self,
        user_id: &str,
        topic: &str,
        correct: bool,
        today: NaiveDate,
    ) -> PortResult<ProgressRecord>;

    async fn get_progress(&self, user_id: &str) -> PortResult<Option<ProgressRecord>>;

    async fn get_topic_progress(&self, user_id: &str) -> PortResult<Vec<TopicProgress>>;

    // --- Reminders ---
    async fn insert_reminder(&self, reminder: NewReminder) -> PortResult<Reminder>;

    async fn list_reminders(&self, user_id: &str) -> PortResult<Vec<Reminder>>;

    /// Moves a pending reminder owned by `user_id` to `cancelled`.
    /// Returns `false` when there was no such pending reminder.
    async fn cancel_reminder(&self, user_id: &str, reminder_id: i64) -> PortResult<bool>;

    /// Marks every pending reminder with `fire_at <= now` as fired and returns them.
    async fn fire_due_reminders(&self, now: DateTime<Utc>) -> PortResult<Vec<Reminder>>;

    // --- Reference Material ---
    async fn list_exams(&self) -> PortResult<Vec<String>>;

    async fn get_exam_info(&self, name: &str) -> PortResult<Option<ExamInfo>>;

    async fn get_notes(&self, topic: &str, subtopic: Option<&str>) -> PortResult<Vec<Note>>;

    async fn get_formulas(&self, topic: &str) -> PortResult<Vec<Formula>>;

    /// Colleges admitting through the named exam, matched case-insensitively.
    async fn colleges_for_exam(&self, exam: &str) -> PortResult<Vec<College>>;
}

#[async_trait]
pub trait TimeParsingService: Send + Sync {
    /// Turns free text such as "tomorrow at 7am" into an absolute instant.
    /// `now` anchors relative expressions.
    async fn parse_time(&self, text: &str, now: DateTime<Utc>) -> PortResult<DateTime<Utc>>;
}
