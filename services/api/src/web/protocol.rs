//! services/api/src/web/protocol.rs
//!
//! Defines the tool-call protocol between the chat orchestrator and the server:
//! the request and response envelopes, and the typed arguments of every tool.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Envelopes
//=========================================================================================

/// A single tool invocation. `arguments` is decoded against the named tool.
#[derive(Deserialize, Serialize, Debug, Clone, ToSchema)]
pub struct ToolCallRequest {
    /// Name of the tool, e.g. `generate_quiz`.
    pub tool: String,
    /// Tool-specific arguments. May be omitted for tools that take none.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub arguments: serde_json::Value,
}

/// The structured result of a successful tool call.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ToolCallResponse {
    pub tool: String,
    #[schema(value_type = Object)]
    pub result: serde_json::Value,
}

/// Body of every failed call.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorDetail {
    /// Stable snake_case error code.
    pub code: String,
    pub message: String,
}

/// One entry of the `GET /tools` listing.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
}

//=========================================================================================
// Tool Names
//=========================================================================================

/// Every tool the server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Validate,
    GetExams,
    GetExamInfo,
    GenerateStudyPlan,
    PredictColleges,
    ListTopics,
    GenerateQuiz,
    DailyQuestion,
    CheckAnswer,
    GetProgress,
    GetNotes,
    GetFormulas,
    SetReminder,
    ListReminders,
    CancelReminder,
}

impl Tool {
    pub const ALL: [Tool; 15] = [
        Tool::Validate,
        Tool::GetExams,
        Tool::GetExamInfo,
        Tool::GenerateStudyPlan,
        Tool::PredictColleges,
        Tool::ListTopics,
        Tool::GenerateQuiz,
        Tool::DailyQuestion,
        Tool::CheckAnswer,
        Tool::GetProgress,
        Tool::GetNotes,
        Tool::GetFormulas,
        Tool::SetReminder,
        Tool::ListReminders,
        Tool::CancelReminder,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Validate => "validate",
            Tool::GetExams => "get_exams",
            Tool::GetExamInfo => "get_exam_info",
            Tool::GenerateStudyPlan => "generate_study_plan",
            Tool::PredictColleges => "predict_colleges",
            Tool::ListTopics => "list_topics",
            Tool::GenerateQuiz => "generate_quiz",
            Tool::DailyQuestion => "daily_question",
            Tool::CheckAnswer => "check_answer",
            Tool::GetProgress => "get_progress",
            Tool::GetNotes => "get_notes",
            Tool::GetFormulas => "get_formulas",
            Tool::SetReminder => "set_reminder",
            Tool::ListReminders => "list_reminders",
            Tool::CancelReminder => "cancel_reminder",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tool::Validate => "Returns the phone number the bearer token belongs to.",
            Tool::GetExams => "Lists the supported competitive exams.",
            Tool::GetExamInfo => "Important dates, pattern, syllabus and books of one exam.",
            Tool::GenerateStudyPlan => {
                "A day-by-day study plan up to the exam date, weighted toward weak areas."
            }
            Tool::PredictColleges => "Colleges whose last cutoffs an expected rank or score clears.",
            Tool::ListTopics => "Topics that have quiz questions.",
            Tool::GenerateQuiz => "Creates a gradable multiple-choice quiz on a topic.",
            Tool::DailyQuestion => "A single practice question on a topic.",
            Tool::CheckAnswer => "Grades one answer of a quiz and updates progress.",
            Tool::GetProgress => "Accuracy, streak and per-topic totals of the caller.",
            Tool::GetNotes => "Revision notes for a topic, optionally one subtopic.",
            Tool::GetFormulas => "Formulas for a topic.",
            Tool::SetReminder => "Schedules a study reminder from a natural-language time.",
            Tool::ListReminders => "The caller's reminders ordered by fire time.",
            Tool::CancelReminder => "Cancels one of the caller's pending reminders.",
        }
    }

    pub fn from_name(name: &str) -> Option<Tool> {
        Tool::ALL.into_iter().find(|t| t.name() == name.trim())
    }
}

//=========================================================================================
// Tool Arguments
//=========================================================================================

fn default_count() -> usize {
    5
}

fn default_hours_per_day() -> u32 {
    2
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ExamInfoArgs {
    pub exam_name: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct StudyPlanArgs {
    pub exam_name: String,
    /// First study day, `YYYY-MM-DD`.
    pub start_date: NaiveDate,
    /// The exam date. The plan stops the day before.
    pub end_date: NaiveDate,
    #[serde(default = "default_hours_per_day")]
    pub hours_per_day: u32,
    #[serde(default)]
    pub weak_areas: Vec<String>,
    #[serde(default)]
    pub strong_areas: Vec<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct PredictCollegesArgs {
    pub exam_name: String,
    pub expected_rank: Option<u32>,
    pub expected_marks: Option<f64>,
    /// Matched as a case-insensitive substring of the college's location.
    pub preferred_location: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct GenerateQuizArgs {
    pub topic: String,
    /// `easy`, `medium` or `hard`. Omit for any difficulty.
    pub difficulty: Option<String>,
    #[serde(default = "default_count")]
    pub count: usize,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct DailyQuestionArgs {
    pub topic: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CheckAnswerArgs {
    pub session_id: Uuid,
    pub question_index: usize,
    pub chosen_choice_index: usize,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct NotesArgs {
    pub topic: String,
    pub subtopic: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct FormulasArgs {
    pub topic: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct SetReminderArgs {
    /// Free text such as "tomorrow at 7am" or an RFC 3339 timestamp.
    pub when: String,
    pub message: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CancelReminderArgs {
    pub reminder_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_round_trip() {
        for tool in Tool::ALL {
            assert_eq!(Tool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(Tool::from_name("predict_colleges"), Some(Tool::PredictColleges));
        assert_eq!(Tool::from_name("predict_weather"), None);
    }

    #[test]
    fn study_plan_arguments_have_defaults() {
        let args: StudyPlanArgs = serde_json::from_str(
            r#"{"exam_name":"JEE","start_date":"2025-01-01","end_date":"2025-03-01"}"#,
        )
        .unwrap();
        assert_eq!(args.hours_per_day, 2);
        assert!(args.weak_areas.is_empty() && args.strong_areas.is_empty());
        assert_eq!(args.end_date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());

        let bad = serde_json::from_str::<StudyPlanArgs>(
            r#"{"exam_name":"JEE","start_date":"01/01/2025","end_date":"2025-03-01"}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn arguments_default_to_null() {
        let call: ToolCallRequest = serde_json::from_str(r#"{"tool":"validate"}"#).unwrap();
        assert!(call.arguments.is_null());
    }

    #[test]
    fn quiz_count_defaults_to_five() {
        let args: GenerateQuizArgs = serde_json::from_str(r#"{"topic":"Physics"}"#).unwrap();
        assert_eq!(args.count, 5);
        assert!(args.difficulty.is_none());
    }
}
