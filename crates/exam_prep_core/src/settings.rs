use chrono::{Duration, FixedOffset, Offset, Utc};

/// Knobs shared by the quiz components.
#[derive(Debug, Clone, Copy)]
pub struct QuizSettings {
    /// How long a generated quiz can still be graded.
    pub session_ttl: Duration,
    /// Offset from UTC used to decide which calendar day an answer falls on.
    pub day_offset: FixedOffset,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(24),
            day_offset: Utc.fix(),
        }
    }
}
