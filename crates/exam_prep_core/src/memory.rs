//! crates/exam_prep_core/src/memory.rs
//!
//! An in-memory `StoreService` used by tests and local prototyping.
//!
//! Progress updates take a per-user async lock, so answers from one user are
//! serialized while different users never wait on each other.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::{
    College, ExamInfo, Formula, NewQuestion, NewReminder, Note, ProgressRecord, Question, QuizSession,
    Reminder, ReminderStatus, TopicProgress,
};
use crate::ports::{PortError, PortResult, StoreService};

#[derive(Default)]
struct Tables {
    questions: Vec<Question>,
    sessions: HashMap<Uuid, QuizSession>,
    topic_progress: HashMap<(String, String), TopicProgress>,
    reminders: Vec<Reminder>,
    exams: Vec<ExamInfo>,
    notes: Vec<Note>,
    formulas: Vec<Formula>,
    colleges: Vec<College>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Simple in-memory store implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    progress: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<ProgressRecord>>>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> PortResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| PortError::Unexpected(e.to_string()))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_exam(&self, exam: ExamInfo) -> PortResult<()> {
        lock(&self.tables)?.exams.push(exam);
        Ok(())
    }

    pub fn add_note(&self, topic: &str, subtopic: &str, text: &str) -> PortResult<Note> {
        let mut tables = lock(&self.tables)?;
        let note = Note {
            id: tables.next_id(),
            topic: topic.to_string(),
            subtopic: subtopic.to_string(),
            text: text.to_string(),
        };
        tables.notes.push(note.clone());
        Ok(note)
    }

    pub fn add_formula(
        &self,
        topic: &str,
        subtopic: &str,
        formula: &str,
        description: &str,
    ) -> PortResult<Formula> {
        let mut tables = lock(&self.tables)?;
        let formula = Formula {
            id: tables.next_id(),
            topic: topic.to_string(),
            subtopic: subtopic.to_string(),
            formula: formula.to_string(),
            description: description.to_string(),
        };
        tables.formulas.push(formula.clone());
        Ok(formula)
    }

    pub fn add_college(&self, college: College) -> PortResult<()> {
        lock(&self.tables)?.colleges.push(college);
        Ok(())
    }

    /// Removes a question, leaving any session that references it dangling.
    pub fn remove_question(&self, question_id: i64) -> PortResult<()> {
        lock(&self.tables)?.questions.retain(|q| q.id != question_id);
        Ok(())
    }

    fn progress_slot(&self, user_id: &str) -> PortResult<Arc<tokio::sync::Mutex<ProgressRecord>>> {
        let mut slots = lock(&self.progress)?;
        let slot = slots
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(ProgressRecord::empty(user_id))));
        Ok(slot.clone())
    }
}

#[async_trait]
impl StoreService for InMemoryStore {
    async fn list_topics(&self) -> PortResult<Vec<String>> {
        let tables = lock(&self.tables)?;
        let mut topics: Vec<String> = Vec::new();
        for question in &tables.questions {
            if !topics.iter().any(|t| t.eq_ignore_ascii_case(&question.topic)) {
                topics.push(question.topic.clone());
            }
        }
        topics.sort();
        Ok(topics)
    }

    async fn questions_for_topic(&self, topic: &str) -> PortResult<Vec<Question>> {
        let tables = lock(&self.tables)?;
        Ok(tables
            .questions
            .iter()
            .filter(|q| q.topic.eq_ignore_ascii_case(topic))
            .cloned()
            .collect())
    }

    async fn get_question(&self, question_id: i64) -> PortResult<Option<Question>> {
        let tables = lock(&self.tables)?;
        Ok(tables.questions.iter().find(|q| q.id == question_id).cloned())
    }

    async fn insert_question(&self, question: NewQuestion) -> PortResult<Question> {
        if question.correct_choice_index >= question.choices.len() {
            return Err(PortError::Unexpected(format!(
                "correct choice {} is outside the {} choices",
                question.correct_choice_index,
                question.choices.len()
            )));
        }
        let mut tables = lock(&self.tables)?;
        let stored = Question {
            id: tables.next_id(),
            topic: question.topic,
            difficulty: question.difficulty,
            text: question.text,
            choices: question.choices,
            correct_choice_index: question.correct_choice_index,
            explanation: question.explanation,
        };
        tables.questions.push(stored.clone());
        Ok(stored)
    }

    async fn insert_session(&self, session: &QuizSession) -> PortResult<()> {
        let mut tables = lock(&self.tables)?;
        if tables.sessions.contains_key(&session.id) {
            return Err(PortError::Unexpected(format!(
                "Session {} already exists",
                session.id
            )));
        }
        tables.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<Option<QuizSession>> {
        Ok(lock(&self.tables)?.sessions.get(&session_id).cloned())
    }

    async fn purge_sessions_expired_before(&self, cutoff: DateTime<Utc>) -> PortResult<u64> {
        let mut tables = lock(&self.tables)?;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| s.expires_at >= cutoff);
        Ok((before - tables.sessions.len()) as u64)
    }

    async fn record_answer(
        &self,
        user_id: &str,
        topic: &str,
        correct: bool,
        today: NaiveDate,
    ) -> PortResult<ProgressRecord> {
        let slot = self.progress_slot(user_id)?;
        let mut record = slot.lock().await;
        // Take both locks before touching either record.
        let mut tables = lock(&self.tables)?;

        record.record_answer(correct, today);
        let tally = tables
            .topic_progress
            .entry((user_id.to_string(), topic.to_string()))
            .or_insert_with(|| TopicProgress {
                topic: topic.to_string(),
                correct_count: 0,
                total_count: 0,
            });
        tally.total_count += 1;
        if correct {
            tally.correct_count += 1;
        }
        Ok(record.clone())
    }

    async fn get_progress(&self, user_id: &str) -> PortResult<Option<ProgressRecord>> {
        let slot = match lock(&self.progress)?.get(user_id) {
            Some(slot) => slot.clone(),
            None => return Ok(None),
        };
        let record = slot.lock().await;
        if record.total_count == 0 {
            return Ok(None);
        }
        Ok(Some(record.clone()))
    }

    async fn get_topic_progress(&self, user_id: &str) -> PortResult<Vec<TopicProgress>> {
        let tables = lock(&self.tables)?;
        let mut topics: Vec<TopicProgress> = tables
            .topic_progress
            .iter()
            .filter(|((user, _), _)| user == user_id)
            .map(|(_, tally)| tally.clone())
            .collect();
        topics.sort_by(|a, b| a.topic.cmp(&b.topic));
        Ok(topics)
    }

    async fn insert_reminder(&self, reminder: NewReminder) -> PortResult<Reminder> {
        let mut tables = lock(&self.tables)?;
        let stored = Reminder {
            id: tables.next_id(),
            user_id: reminder.user_id,
            message: reminder.message,
            fire_at: reminder.fire_at,
            status: ReminderStatus::Pending,
            created_at: reminder.created_at,
        };
        tables.reminders.push(stored.clone());
        Ok(stored)
    }

    async fn list_reminders(&self, user_id: &str) -> PortResult<Vec<Reminder>> {
        let tables = lock(&self.tables)?;
        let mut reminders: Vec<Reminder> = tables
            .reminders
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        reminders.sort_by_key(|r| (r.fire_at, r.id));
        Ok(reminders)
    }

    async fn cancel_reminder(&self, user_id: &str, reminder_id: i64) -> PortResult<bool> {
        let mut tables = lock(&self.tables)?;
        match tables.reminders.iter_mut().find(|r| {
            r.id == reminder_id && r.user_id == user_id && r.status == ReminderStatus::Pending
        }) {
            Some(reminder) => {
                reminder.status = ReminderStatus::Cancelled;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn fire_due_reminders(&self, now: DateTime<Utc>) -> PortResult<Vec<Reminder>> {
        let mut tables = lock(&self.tables)?;
        let mut fired = Vec::new();
        for reminder in tables.reminders.iter_mut() {
            if reminder.status == ReminderStatus::Pending && reminder.fire_at <= now {
                reminder.status = ReminderStatus::Fired;
                fired.push(reminder.clone());
            }
        }
        Ok(fired)
    }

    async fn list_exams(&self) -> PortResult<Vec<String>> {
        let tables = lock(&self.tables)?;
        let mut names: Vec<String> = tables.exams.iter().map(|e| e.name.clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn get_exam_info(&self, name: &str) -> PortResult<Option<ExamInfo>> {
        let tables = lock(&self.tables)?;
        Ok(tables
            .exams
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn get_notes(&self, topic: &str, subtopic: Option<&str>) -> PortResult<Vec<Note>> {
        let tables = lock(&self.tables)?;
        Ok(tables
            .notes
            .iter()
            .filter(|n| n.topic.eq_ignore_ascii_case(topic))
            .filter(|n| subtopic.map_or(true, |s| n.subtopic.eq_ignore_ascii_case(s)))
            .cloned()
            .collect())
    }

    async fn get_formulas(&self, topic: &str) -> PortResult<Vec<Formula>> {
        let tables = lock(&self.tables)?;
        Ok(tables
            .formulas
            .iter()
            .filter(|f| f.topic.eq_ignore_ascii_case(topic))
            .cloned()
            .collect())
    }

    async fn colleges_for_exam(&self, exam: &str) -> PortResult<Vec<College>> {
        let tables = lock(&self.tables)?;
        Ok(tables
            .colleges
            .iter()
            .filter(|c| c.exam.eq_ignore_ascii_case(exam))
            .cloned()
            .collect())
    }
}
