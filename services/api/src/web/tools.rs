//! services/api/src/web/tools.rs
//!
//! The tool-call endpoint: decodes the envelope, dispatches to the core
//! components, and maps `ToolError` onto HTTP statuses with a JSON error body.

use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use exam_prep_core::{CollegeQuery, Difficulty, QuizRequest, StudyPlanRequest, ToolError};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::web::middleware::CallerId;
use crate::web::protocol::{
    CancelReminderArgs, CheckAnswerArgs, DailyQuestionArgs, ErrorDetail, ErrorResponse,
    ExamInfoArgs, FormulasArgs, GenerateQuizArgs, NotesArgs, PredictCollegesArgs,
    SetReminderArgs, StudyPlanArgs, Tool, ToolCallRequest, ToolCallResponse, ToolDescription,
};
use crate::web::state::AppState;

//=========================================================================================
// Error Response
//=========================================================================================

/// A failed call, rendered as `{"error": {"code", "message"}}` with `status`.
#[derive(Debug)]
pub struct ToolFailure {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ToolFailure {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
        }
    }

    fn malformed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "malformed_request", message)
    }
}

/// HTTP status for each core error.
pub fn status_for(err: &ToolError) -> StatusCode {
    match err {
        ToolError::InvalidArgument(_) | ToolError::IndexOutOfRange { .. } => {
            StatusCode::BAD_REQUEST
        }
        ToolError::UnknownTopic(_)
        | ToolError::SessionNotFound(_)
        | ToolError::ExamNotFound(_)
        | ToolError::ReminderNotFound(_) => StatusCode::NOT_FOUND,
        ToolError::SessionExpired(_) => StatusCode::GONE,
        ToolError::TimeParse(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ToolError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl From<ToolError> for ToolFailure {
    fn from(err: ToolError) -> Self {
        Self::new(status_for(&err), err.code(), err.to_string())
    }
}

impl IntoResponse for ToolFailure {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Invoke one tool.
///
/// The caller's identity comes from the bearer token; tools never take a user id argument.
#[utoipa::path(
    post,
    path = "/tools/call",
    request_body = ToolCallRequest,
    responses(
        (status = 200, description = "Tool result", body = ToolCallResponse),
        (status = 400, description = "Invalid argument or question index out of range", body = ErrorResponse),
        (status = 401, description = "Missing or wrong bearer token", body = ErrorResponse),
        (status = 404, description = "Unknown topic, session, exam or reminder", body = ErrorResponse),
        (status = 410, description = "Quiz session expired", body = ErrorResponse),
        (status = 422, description = "Malformed envelope, unknown tool or unparseable time", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse),
        (status = 504, description = "Time parser timed out", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn call_tool_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerId>,
    payload: Result<Json<ToolCallRequest>, JsonRejection>,
) -> Result<Json<ToolCallResponse>, ToolFailure> {
    let Json(call) = payload.map_err(|e| ToolFailure::malformed(e.body_text()))?;
    let tool = Tool::from_name(&call.tool).ok_or_else(|| {
        ToolFailure::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "unknown_tool",
            format!("Unknown tool '{}'", call.tool),
        )
    })?;

    debug!(tool = tool.name(), "Dispatching tool call");
    match dispatch(&state, &caller.0, tool, call.arguments).await {
        Ok(result) => Ok(Json(ToolCallResponse {
            tool: tool.name().to_string(),
            result,
        })),
        Err(failure) => {
            if failure.status.is_server_error() {
                error!(tool = tool.name(), code = %failure.code, "Tool call failed: {}", failure.message);
            } else {
                info!(tool = tool.name(), code = %failure.code, "Tool call rejected: {}", failure.message);
            }
            Err(failure)
        }
    }
}

/// List the available tools.
#[utoipa::path(
    get,
    path = "/tools",
    responses(
        (status = 200, description = "Every tool the server exposes", body = [ToolDescription]),
        (status = 401, description = "Missing or wrong bearer token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn list_tools_handler() -> Json<Vec<ToolDescription>> {
    Json(
        Tool::ALL
            .iter()
            .map(|tool| ToolDescription {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
            })
            .collect(),
    )
}

//=========================================================================================
// Dispatch
//=========================================================================================

async fn dispatch(
    state: &AppState,
    user_id: &str,
    tool: Tool,
    arguments: Value,
) -> Result<Value, ToolFailure> {
    match tool {
        Tool::Validate => to_json(&state.config.my_number),
        Tool::GetExams => to_json(&state.reference.exams().await?),
        Tool::GetExamInfo => {
            let args: ExamInfoArgs = decode(arguments)?;
            to_json(&state.reference.exam_info(&args.exam_name).await?)
        }
        Tool::GenerateStudyPlan => {
            let args: StudyPlanArgs = decode(arguments)?;
            let plan = state
                .reference
                .study_plan(StudyPlanRequest {
                    exam_name: args.exam_name,
                    start_date: args.start_date,
                    end_date: args.end_date,
                    hours_per_day: args.hours_per_day,
                    weak_areas: args.weak_areas,
                    strong_areas: args.strong_areas,
                })
                .await?;
            to_json(&plan)
        }
        Tool::PredictColleges => {
            let args: PredictCollegesArgs = decode(arguments)?;
            let colleges = state
                .reference
                .predict_colleges(CollegeQuery {
                    exam_name: args.exam_name,
                    expected_rank: args.expected_rank,
                    expected_marks: args.expected_marks,
                    preferred_location: args.preferred_location,
                })
                .await?;
            to_json(&colleges)
        }
        Tool::ListTopics => to_json(&state.quiz.topics().await?),
        Tool::GenerateQuiz => {
            let args: GenerateQuizArgs = decode(arguments)?;
            let difficulty = match args.difficulty.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(raw) => Some(
                    raw.parse::<Difficulty>()
                        .map_err(ToolError::InvalidArgument)?,
                ),
            };
            let view = state
                .quiz
                .generate_quiz(QuizRequest {
                    user_id: user_id.to_string(),
                    topic: args.topic,
                    difficulty,
                    count: args.count,
                })
                .await?;
            to_json(&view)
        }
        Tool::DailyQuestion => {
            let args: DailyQuestionArgs = decode(arguments)?;
            to_json(&state.quiz.daily_question(user_id, &args.topic).await?)
        }
        Tool::CheckAnswer => {
            let args: CheckAnswerArgs = decode(arguments)?;
            let outcome = state
                .checker
                .check_answer(args.session_id, args.question_index, args.chosen_choice_index)
                .await?;
            to_json(&outcome)
        }
        Tool::GetProgress => to_json(&state.progress.get_progress(user_id).await?),
        Tool::GetNotes => {
            let args: NotesArgs = decode(arguments)?;
            to_json(
                &state
                    .reference
                    .notes(&args.topic, args.subtopic.as_deref())
                    .await?,
            )
        }
        Tool::GetFormulas => {
            let args: FormulasArgs = decode(arguments)?;
            to_json(&state.reference.formulas(&args.topic).await?)
        }
        Tool::SetReminder => {
            let args: SetReminderArgs = decode(arguments)?;
            let limit = state.config.time_parser_timeout;
            let reminder = tokio::time::timeout(
                limit,
                state
                    .reminders
                    .set_reminder(user_id, &args.when, &args.message),
            )
            .await
            .map_err(|_| {
                warn!(when = %args.when, "Time parser timed out");
                ToolFailure::new(
                    StatusCode::GATEWAY_TIMEOUT,
                    "time_parser_timeout",
                    format!("The time parser did not answer within {}s", limit.as_secs()),
                )
            })??;
            to_json(&reminder)
        }
        Tool::ListReminders => to_json(&state.reminders.list_reminders(user_id).await?),
        Tool::CancelReminder => {
            let args: CancelReminderArgs = decode(arguments)?;
            state
                .reminders
                .cancel_reminder(user_id, args.reminder_id)
                .await?;
            Ok(serde_json::json!({ "reminder_id": args.reminder_id, "status": "cancelled" }))
        }
    }
}

/// Decodes tool arguments; a missing `arguments` field reads as `{}`.
fn decode<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolFailure> {
    let arguments = if arguments.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        arguments
    };
    serde_json::from_value(arguments)
        .map_err(|e| ToolFailure::malformed(format!("Invalid arguments: {e}")))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ToolFailure> {
    serde_json::to_value(value).map_err(|e| {
        ToolFailure::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn core_errors_map_to_statuses() {
        let cases = [
            (ToolError::UnknownTopic("Art".into()), StatusCode::NOT_FOUND),
            (ToolError::SessionExpired(Uuid::nil()), StatusCode::GONE),
            (
                ToolError::IndexOutOfRange { index: 3, len: 2 },
                StatusCode::BAD_REQUEST,
            ),
            (ToolError::TimeParse("?".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (
                ToolError::StoreUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            let failure = ToolFailure::from(err);
            assert_eq!(failure.status, status, "{}", failure.code);
        }
    }

    #[test]
    fn null_arguments_decode_as_empty_object() {
        #[derive(serde::Deserialize)]
        struct NoArgs {}
        assert!(decode::<NoArgs>(Value::Null).is_ok());
        let err = decode::<FormulasArgs>(Value::Null).unwrap_err();
        assert_eq!(err.code, "malformed_request");
    }
}
