//! crates/exam_prep_core/src/error.rs
//!
//! The error taxonomy of the tool operations. Every variant is terminal for the
//! request that produced it; only `StoreUnavailable` is worth retrying.

use uuid::Uuid;

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),
    #[error("Quiz session {0} not found")]
    SessionNotFound(Uuid),
    #[error("Quiz session {0} has expired")]
    SessionExpired(Uuid),
    #[error("Question index {index} is out of range for a quiz of {len} questions")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Exam not found: {0}")]
    ExamNotFound(String),
    #[error("Reminder {0} not found")]
    ReminderNotFound(i64),
    #[error("Could not understand the time: {0}")]
    TimeParse(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl ToolError {
    /// Stable machine-readable code for the transport layer.
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::UnknownTopic(_) => "unknown_topic",
            ToolError::SessionNotFound(_) => "session_not_found",
            ToolError::SessionExpired(_) => "session_expired",
            ToolError::IndexOutOfRange { .. } => "index_out_of_range",
            ToolError::InvalidArgument(_) => "invalid_argument",
            ToolError::ExamNotFound(_) => "exam_not_found",
            ToolError::ReminderNotFound(_) => "reminder_not_found",
            ToolError::TimeParse(_) => "time_parse",
            ToolError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

/// Store failures all surface as `StoreUnavailable`; the core has no use for finer detail.
impl From<PortError> for ToolError {
    fn from(err: PortError) -> Self {
        ToolError::StoreUnavailable(err.to_string())
    }
}

pub type ToolResult<T> = Result<T, ToolError>;
