//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `StoreService` port from the `core` crate. It handles all interactions
//! with the SQLite database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use exam_prep_core::domain::{
    College, Difficulty, ExamInfo, Formula, NewQuestion, NewReminder, Note, ProgressRecord, Question,
    QuizSession, Reminder, ReminderStatus, TopicProgress,
};
use exam_prep_core::ports::{PortError, PortResult, StoreService};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `StoreService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a pool for `database_url`, creating the database file if needed.
    ///
    /// In-memory databases live and die with their connection, so they get a
    /// single connection that is never recycled.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

        let mut options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(5))
        };

        let pool = pool_options.connect_with(options).await?;
        Ok(Self::new(pool))
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes every pooled connection. Called once on shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

//=========================================================================================
// Conversion Helpers
//=========================================================================================

fn unexpected(e: impl std::fmt::Display) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(field: &str, millis: i64) -> PortResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| PortError::Unexpected(format!("{field} out of range: {millis}")))
}

fn to_count(field: &str, value: i64) -> PortResult<u32> {
    u32::try_from(value).map_err(|_| PortError::Unexpected(format!("{field} out of range: {value}")))
}

fn parse_date(field: &str, value: &str) -> PortResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| PortError::Unexpected(format!("{field} '{value}' is not a date: {e}")))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct QuestionRecord {
    id: i64,
    topic: String,
    difficulty: String,
    text: String,
    choices: String,
    correct_choice_index: i64,
    explanation: String,
}
impl QuestionRecord {
    fn to_domain(self) -> PortResult<Question> {
        let choices: Vec<String> = serde_json::from_str(&self.choices).map_err(unexpected)?;
        let correct_choice_index = usize::try_from(self.correct_choice_index).map_err(unexpected)?;
        Ok(Question {
            id: self.id,
            topic: self.topic,
            difficulty: self.difficulty.parse::<Difficulty>().map_err(PortError::Unexpected)?,
            text: self.text,
            choices,
            correct_choice_index,
            explanation: self.explanation,
        })
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: String,
    user_id: String,
    topic: String,
    question_ids: String,
    created_at: i64,
    expires_at: i64,
}
impl SessionRecord {
    fn to_domain(self) -> PortResult<QuizSession> {
        Ok(QuizSession {
            id: Uuid::parse_str(&self.id).map_err(unexpected)?,
            user_id: self.user_id,
            topic: self.topic,
            question_ids: serde_json::from_str(&self.question_ids).map_err(unexpected)?,
            created_at: from_millis("created_at", self.created_at)?,
            expires_at: from_millis("expires_at", self.expires_at)?,
        })
    }
}

#[derive(FromRow)]
struct ProgressRow {
    user_id: String,
    correct_count: i64,
    total_count: i64,
    current_streak: i64,
    last_activity_date: Option<String>,
}
impl ProgressRow {
    fn to_domain(self) -> PortResult<ProgressRecord> {
        Ok(ProgressRecord {
            user_id: self.user_id,
            correct_count: to_count("correct_count", self.correct_count)?,
            total_count: to_count("total_count", self.total_count)?,
            current_streak: to_count("current_streak", self.current_streak)?,
            last_activity_date: self
                .last_activity_date
                .as_deref()
                .map(|d| parse_date("last_activity_date", d))
                .transpose()?,
        })
    }
}

#[derive(FromRow)]
struct TopicProgressRow {
    topic: String,
    correct_count: i64,
    total_count: i64,
}
impl TopicProgressRow {
    fn to_domain(self) -> PortResult<TopicProgress> {
        Ok(TopicProgress {
            topic: self.topic,
            correct_count: to_count("correct_count", self.correct_count)?,
            total_count: to_count("total_count", self.total_count)?,
        })
    }
}

#[derive(FromRow)]
struct ReminderRecord {
    id: i64,
    user_id: String,
    message: String,
    fire_at: i64,
    status: String,
    created_at: i64,
}
impl ReminderRecord {
    fn to_domain(self) -> PortResult<Reminder> {
        Ok(Reminder {
            id: self.id,
            user_id: self.user_id,
            message: self.message,
            fire_at: from_millis("fire_at", self.fire_at)?,
            status: self.status.parse::<ReminderStatus>().map_err(PortError::Unexpected)?,
            created_at: from_millis("created_at", self.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct ExamRecord {
    name: String,
    description: String,
    important_dates: String,
    pattern: String,
    syllabus: String,
    resources: String,
}
impl ExamRecord {
    fn to_domain(self) -> PortResult<ExamInfo> {
        Ok(ExamInfo {
            name: self.name,
            description: self.description,
            important_dates: serde_json::from_str(&self.important_dates).map_err(unexpected)?,
            pattern: serde_json::from_str(&self.pattern).map_err(unexpected)?,
            syllabus: serde_json::from_str(&self.syllabus).map_err(unexpected)?,
            resources: serde_json::from_str(&self.resources).map_err(unexpected)?,
        })
    }
}

#[derive(FromRow)]
struct NoteRecord {
    id: i64,
    topic: String,
    subtopic: String,
    note: String,
}
impl NoteRecord {
    fn to_domain(self) -> Note {
        Note {
            id: self.id,
            topic: self.topic,
            subtopic: self.subtopic,
            text: self.note,
        }
    }
}

#[derive(FromRow)]
struct FormulaRecord {
    id: i64,
    topic: String,
    subtopic: String,
    formula: String,
    description: String,
}
impl FormulaRecord {
    fn to_domain(self) -> Formula {
        Formula {
            id: self.id,
            topic: self.topic,
            subtopic: self.subtopic,
            formula: self.formula,
            description: self.description,
        }
    }
}

#[derive(FromRow)]
struct CollegeRecord {
    exam: String,
    name: String,
    cutoff_rank: i64,
    cutoff_marks: f64,
    fees: String,
    location: String,
}
impl CollegeRecord {
    fn to_domain(self) -> PortResult<College> {
        Ok(College {
            exam: self.exam,
            name: self.name,
            cutoff_rank: to_count("cutoff_rank", self.cutoff_rank)?,
            cutoff_marks: self.cutoff_marks,
            fees: self.fees,
            location: self.location,
        })
    }
}

//=========================================================================================
// `StoreService` Trait Implementation
//=========================================================================================

#[async_trait]
impl StoreService for DbAdapter {
    async fn list_topics(&self) -> PortResult<Vec<String>> {
        let topics: Vec<(String,)> = sqlx::query_as(
            "SELECT MIN(topic) FROM questions GROUP BY topic COLLATE NOCASE ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(topics.into_iter().map(|(t,)| t).collect())
    }

    async fn questions_for_topic(&self, topic: &str) -> PortResult<Vec<Question>> {
        let records = sqlx::query_as::<_, QuestionRecord>(
            "SELECT id, topic, difficulty, text, choices, correct_choice_index, explanation
             FROM questions WHERE topic = ?1 COLLATE NOCASE ORDER BY id",
        )
        .bind(topic)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(QuestionRecord::to_domain).collect()
    }

    async fn get_question(&self, question_id: i64) -> PortResult<Option<Question>> {
        let record = sqlx::query_as::<_, QuestionRecord>(
            "SELECT id, topic, difficulty, text, choices, correct_choice_index, explanation
             FROM questions WHERE id = ?1",
        )
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(QuestionRecord::to_domain).transpose()
    }

    async fn insert_question(&self, question: NewQuestion) -> PortResult<Question> {
        if question.correct_choice_index >= question.choices.len() {
            return Err(PortError::Unexpected(format!(
                "correct choice {} is outside the {} choices",
                question.correct_choice_index,
                question.choices.len()
            )));
        }
        let choices = serde_json::to_string(&question.choices).map_err(unexpected)?;
        let correct = i64::try_from(question.correct_choice_index).map_err(unexpected)?;
        let record = sqlx::query_as::<_, QuestionRecord>(
            "INSERT INTO questions (topic, difficulty, text, choices, correct_choice_index, explanation)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, topic, difficulty, text, choices, correct_choice_index, explanation",
        )
        .bind(&question.topic)
        .bind(question.difficulty.as_str())
        .bind(&question.text)
        .bind(choices)
        .bind(correct)
        .bind(&question.explanation)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn insert_session(&self, session: &QuizSession) -> PortResult<()> {
        let question_ids = serde_json::to_string(&session.question_ids).map_err(unexpected)?;
        sqlx::query(
            "INSERT INTO quiz_sessions (id, user_id, topic, question_ids, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(session.id.to_string())
        .bind(&session.user_id)
        .bind(&session.topic)
        .bind(question_ids)
        .bind(to_millis(session.created_at))
        .bind(to_millis(session.expires_at))
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<Option<QuizSession>> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, user_id, topic, question_ids, created_at, expires_at
             FROM quiz_sessions WHERE id = ?1",
        )
        .bind(session_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(SessionRecord::to_domain).transpose()
    }

    async fn purge_sessions_expired_before(&self, cutoff: DateTime<Utc>) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM quiz_sessions WHERE expires_at < ?1")
            .bind(to_millis(cutoff))
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn record_answer(
        &self,
        user_id: &str,
        topic: &str,
        correct: bool,
        today: NaiveDate,
    ) -> PortResult<ProgressRecord> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // A write first, so this transaction holds SQLite's write lock before it reads.
        // Concurrent graders for the same user queue here instead of losing updates.
        sqlx::query("INSERT INTO progress (user_id) VALUES (?1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        let mut record = sqlx::query_as::<_, ProgressRow>(
            "SELECT user_id, correct_count, total_count, current_streak, last_activity_date
             FROM progress WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?
        .to_domain()?;

        record.record_answer(correct, today);

        sqlx::query(
            "UPDATE progress
             SET correct_count = ?2, total_count = ?3, current_streak = ?4, last_activity_date = ?5
             WHERE user_id = ?1",
        )
        .bind(user_id)
        .bind(i64::from(record.correct_count))
        .bind(i64::from(record.total_count))
        .bind(i64::from(record.current_streak))
        .bind(today.format(DATE_FORMAT).to_string())
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        sqlx::query(
            "INSERT INTO topic_progress (user_id, topic, correct_count, total_count)
             VALUES (?1, ?2, ?3, 1)
             ON CONFLICT (user_id, topic) DO UPDATE SET
                 correct_count = correct_count + excluded.correct_count,
                 total_count = total_count + 1",
        )
        .bind(user_id)
        .bind(topic)
        .bind(i64::from(correct))
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record)
    }

    async fn get_progress(&self, user_id: &str) -> PortResult<Option<ProgressRecord>> {
        let row = sqlx::query_as::<_, ProgressRow>(
            "SELECT user_id, correct_count, total_count, current_streak, last_activity_date
             FROM progress WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        row.map(ProgressRow::to_domain).transpose()
    }

    async fn get_topic_progress(&self, user_id: &str) -> PortResult<Vec<TopicProgress>> {
        let rows = sqlx::query_as::<_, TopicProgressRow>(
            "SELECT topic, correct_count, total_count
             FROM topic_progress WHERE user_id = ?1 ORDER BY topic",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        rows.into_iter().map(TopicProgressRow::to_domain).collect()
    }

    async fn insert_reminder(&self, reminder: NewReminder) -> PortResult<Reminder> {
        let record = sqlx::query_as::<_, ReminderRecord>(
            "INSERT INTO reminders (user_id, message, fire_at, status, created_at)
             VALUES (?1, ?2, ?3, 'pending', ?4)
             RETURNING id, user_id, message, fire_at, status, created_at",
        )
        .bind(&reminder.user_id)
        .bind(&reminder.message)
        .bind(to_millis(reminder.fire_at))
        .bind(to_millis(reminder.created_at))
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn list_reminders(&self, user_id: &str) -> PortResult<Vec<Reminder>> {
        let records = sqlx::query_as::<_, ReminderRecord>(
            "SELECT id, user_id, message, fire_at, status, created_at
             FROM reminders WHERE user_id = ?1 ORDER BY fire_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(ReminderRecord::to_domain).collect()
    }

    async fn cancel_reminder(&self, user_id: &str, reminder_id: i64) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE reminders SET status = 'cancelled'
             WHERE id = ?1 AND user_id = ?2 AND status = 'pending'",
        )
        .bind(reminder_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected() == 1)
    }

    async fn fire_due_reminders(&self, now: DateTime<Utc>) -> PortResult<Vec<Reminder>> {
        let records = sqlx::query_as::<_, ReminderRecord>(
            "UPDATE reminders SET status = 'fired'
             WHERE status = 'pending' AND fire_at <= ?1
             RETURNING id, user_id, message, fire_at, status, created_at",
        )
        .bind(to_millis(now))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        let mut fired = records
            .into_iter()
            .map(ReminderRecord::to_domain)
            .collect::<PortResult<Vec<_>>>()?;
        fired.sort_by_key(|r| (r.fire_at, r.id));
        Ok(fired)
    }

    async fn list_exams(&self) -> PortResult<Vec<String>> {
        let names: Vec<(String,)> = sqlx::query_as("SELECT name FROM exam_info ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(names.into_iter().map(|(n,)| n).collect())
    }

    async fn get_exam_info(&self, name: &str) -> PortResult<Option<ExamInfo>> {
        let record = sqlx::query_as::<_, ExamRecord>(
            "SELECT name, description, important_dates, pattern, syllabus, resources
             FROM exam_info WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(ExamRecord::to_domain).transpose()
    }

    async fn get_notes(&self, topic: &str, subtopic: Option<&str>) -> PortResult<Vec<Note>> {
        let records = sqlx::query_as::<_, NoteRecord>(
            "SELECT id, topic, subtopic, note FROM notes
             WHERE topic = ?1 COLLATE NOCASE
               AND (?2 IS NULL OR subtopic = ?2 COLLATE NOCASE)
             ORDER BY subtopic, id",
        )
        .bind(topic)
        .bind(subtopic)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(NoteRecord::to_domain).collect())
    }

    async fn get_formulas(&self, topic: &str) -> PortResult<Vec<Formula>> {
        let records = sqlx::query_as::<_, FormulaRecord>(
            "SELECT id, topic, subtopic, formula, description FROM formulas
             WHERE topic = ?1 COLLATE NOCASE ORDER BY subtopic, id",
        )
        .bind(topic)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(FormulaRecord::to_domain).collect())
    }

    async fn colleges_for_exam(&self, exam: &str) -> PortResult<Vec<College>> {
        let records = sqlx::query_as::<_, CollegeRecord>(
            "SELECT exam, name, cutoff_rank, cutoff_marks, fees, location FROM colleges
             WHERE exam = ?1 COLLATE NOCASE ORDER BY cutoff_rank, name",
        )
        .bind(exam)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(CollegeRecord::to_domain).collect()
    }
}
