//! crates/exam_prep_core/src/domain.rs
//!
//! Defines the core data structures for the exam prep tool server.
//! These structs are independent of any database; the ones returned to callers
//! derive `Serialize` so the transport can hand them out as structured results.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Question Bank
//=========================================================================================

/// Difficulty bucket of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

/// A multiple-choice question. Immutable once seeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: i64,
    pub topic: String,
    pub difficulty: Difficulty,
    pub text: String,
    pub choices: Vec<String>,
    pub correct_choice_index: usize,
    pub explanation: String,
}

/// A question as it is about to be inserted, before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub topic: String,
    pub difficulty: Difficulty,
    pub text: String,
    pub choices: Vec<String>,
    pub correct_choice_index: usize,
    pub explanation: String,
}

//=========================================================================================
// Quiz Sessions
//=========================================================================================

/// A server-held record binding a set of questions to a user for later grading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSession {
    pub id: Uuid,
    pub user_id: String,
    pub topic: String,
    pub question_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl QuizSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// One question as shown to the caller. Carries no answer data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizItem {
    pub index: usize,
    pub question_id: i64,
    pub text: String,
    pub choices: Vec<String>,
    pub difficulty: Difficulty,
}

impl QuizItem {
    pub fn from_question(index: usize, question: &Question) -> Self {
        Self {
            index,
            question_id: question.id,
            text: question.text.clone(),
            choices: question.choices.clone(),
            difficulty: question.difficulty,
        }
    }
}

/// The payload returned by quiz generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizView {
    pub session_id: Uuid,
    pub topic: String,
    pub difficulty: Option<Difficulty>,
    /// Fewer questions matched than were requested.
    pub partial: bool,
    /// The requested difficulty had no questions, so every difficulty was used.
    pub difficulty_relaxed: bool,
    pub expires_at: DateTime<Utc>,
    pub questions: Vec<QuizItem>,
}

/// Result of grading one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub correct_choice_index: usize,
    pub explanation: String,
    pub current_streak: u32,
}

//=========================================================================================
// Progress
//=========================================================================================

/// Per-user totals and streak. Keyed 1:1 by `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressRecord {
    pub user_id: String,
    pub correct_count: u32,
    pub total_count: u32,
    pub current_streak: u32,
    pub last_activity_date: Option<NaiveDate>,
}

impl ProgressRecord {
    /// The record of a user who has never answered anything.
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            correct_count: 0,
            total_count: 0,
            current_streak: 0,
            last_activity_date: None,
        }
    }

    /// Applies one graded answer on `today`.
    ///
    /// Same day keeps the streak, the following day extends it, anything else
    /// (a gap, or a clock that moved backwards) restarts it at 1.
    pub fn record_answer(&mut self, correct: bool, today: NaiveDate) {
        self.total_count += 1;
        if correct {
            self.correct_count += 1;
        }
        self.current_streak = match self.last_activity_date {
            Some(last) if last == today => self.current_streak.max(1),
            Some(last) if last + Duration::days(1) == today => self.current_streak + 1,
            _ => 1,
        };
        self.last_activity_date = Some(today);
    }

    /// The streak as it stands on `today`: 0 once a full day has been missed.
    pub fn streak_on(&self, today: NaiveDate) -> u32 {
        match self.last_activity_date {
            Some(last) if last == today || last + Duration::days(1) == today => {
                self.current_streak
            }
            _ => 0,
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            f64::from(self.correct_count) / f64::from(self.total_count)
        }
    }
}

/// Per-topic correct/total tally, updated alongside the `ProgressRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicProgress {
    pub topic: String,
    pub correct_count: u32,
    pub total_count: u32,
}

/// What `get_progress` reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub user_id: String,
    pub correct_count: u32,
    pub total_count: u32,
    pub accuracy: f64,
    pub current_streak: u32,
    pub last_activity_date: Option<NaiveDate>,
    pub topics: Vec<TopicProgress>,
}

//=========================================================================================
// Reminders
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Pending,
    Fired,
    Cancelled,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Fired => "fired",
            ReminderStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ReminderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReminderStatus::Pending),
            "fired" => Ok(ReminderStatus::Fired),
            "cancelled" => Ok(ReminderStatus::Cancelled),
            other => Err(format!("unknown reminder status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    pub id: i64,
    pub user_id: String,
    pub message: String,
    pub fire_at: DateTime<Utc>,
    pub status: ReminderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReminder {
    pub user_id: String,
    pub message: String,
    pub fire_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Reference Material
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub id: i64,
    pub topic: String,
    pub subtopic: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Formula {
    pub id: i64,
    pub topic: String,
    pub subtopic: String,
    pub formula: String,
    pub description: String,
}

/// Calendar, pattern and syllabus of a competitive exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamInfo {
    pub name: String,
    pub description: String,
    pub important_dates: BTreeMap<String, String>,
    pub pattern: BTreeMap<String, String>,
    pub syllabus: BTreeMap<String, Vec<String>>,
    /// Recommended books per subject.
    #[serde(default)]
    pub resources: BTreeMap<String, Vec<String>>,
}

/// A college with the previous year's closing rank and marks for one exam.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct College {
    pub exam: String,
    pub name: String,
    pub cutoff_rank: u32,
    pub cutoff_marks: f64,
    pub fees: String,
    pub location: String,
}

//=========================================================================================
// Study Plans
//=========================================================================================

/// One scheduled day of a study plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudyDay {
    pub date: NaiveDate,
    /// `"Subject: Topic"`, or `"Revision"` on the closing days.
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub hours: u32,
    pub activities: Vec<String>,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudyPlan {
    pub exam: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub hours_per_day: u32,
    /// Every day from `start_date` up to, but not including, `end_date`.
    pub days: Vec<StudyDay>,
    /// The closing days given over to revision, in date order.
    pub revision_days: Vec<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn first_answer_starts_streak() {
        let mut record = ProgressRecord::empty("u1");
        record.record_answer(false, day(1));
        assert_eq!(record.total_count, 1);
        assert_eq!(record.correct_count, 0);
        assert_eq!(record.current_streak, 1);
        assert_eq!(record.last_activity_date, Some(day(1)));
    }

    #[test]
    fn same_day_keeps_streak_and_next_day_extends_it() {
        let mut record = ProgressRecord::empty("u1");
        record.record_answer(true, day(1));
        record.record_answer(true, day(1));
        assert_eq!(record.current_streak, 1);
        record.record_answer(false, day(2));
        assert_eq!(record.current_streak, 2);
        assert_eq!(record.total_count, 3);
        assert_eq!(record.correct_count, 2);
    }

    #[test]
    fn gap_resets_streak_to_one() {
        let mut record = ProgressRecord::empty("u1");
        record.record_answer(true, day(1));
        record.record_answer(true, day(2));
        record.record_answer(true, day(4));
        assert_eq!(record.current_streak, 1);
    }

    #[test]
    fn clock_moving_backwards_restarts_streak() {
        let mut record = ProgressRecord::empty("u1");
        record.record_answer(true, day(5));
        record.record_answer(true, day(6));
        record.record_answer(true, day(3));
        assert_eq!(record.current_streak, 1);
        assert_eq!(record.last_activity_date, Some(day(3)));
    }

    #[test]
    fn streak_reads_as_zero_once_stale() {
        let mut record = ProgressRecord::empty("u1");
        record.record_answer(true, day(1));
        record.record_answer(true, day(2));
        assert_eq!(record.streak_on(day(2)), 2);
        assert_eq!(record.streak_on(day(3)), 2);
        assert_eq!(record.streak_on(day(4)), 0);
    }

    #[test]
    fn accuracy_handles_empty_record() {
        let mut record = ProgressRecord::empty("u1");
        assert_eq!(record.accuracy(), 0.0);
        record.record_answer(true, day(1));
        record.record_answer(false, day(1));
        assert!((record.accuracy() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("Hard".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert_eq!(" easy ".parse::<Difficulty>(), Ok(Difficulty::Easy));
        assert!("brutal".parse::<Difficulty>().is_err());
    }

    #[test]
    fn quiz_item_serialization_carries_no_answer_key() {
        let question = Question {
            id: 7,
            topic: "Physics".into(),
            difficulty: Difficulty::Easy,
            text: "What is the SI unit of force?".into(),
            choices: vec!["Newton".into(), "Joule".into()],
            correct_choice_index: 0,
            explanation: "Force is measured in Newtons.".into(),
        };
        let json = serde_json::to_value(QuizItem::from_question(0, &question)).unwrap();
        assert!(json.get("correct_choice_index").is_none());
        assert!(json.get("explanation").is_none());
        assert_eq!(json["difficulty"], "easy");
    }
}
