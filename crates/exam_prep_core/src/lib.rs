pub mod domain;
pub mod error;
pub mod grading;
pub mod memory;
pub mod planning;
pub mod ports;
pub mod progress;
pub mod quiz;
pub mod reference;
pub mod reminders;
pub mod settings;
pub mod time;

pub use domain::{
    AnswerOutcome, College, Difficulty, ExamInfo, Formula, NewQuestion, NewReminder, Note,
    ProgressRecord, ProgressReport, Question, QuizItem, QuizSession, QuizView, Reminder,
    ReminderStatus, StudyDay, StudyPlan, TopicProgress,
};
pub use error::{ToolError, ToolResult};
pub use grading::AnswerChecker;
pub use memory::InMemoryStore;
pub use planning::{CollegeQuery, StudyPlanRequest};
pub use ports::{PortError, PortResult, StoreService, TimeParsingService};
pub use progress::ProgressTracker;
pub use quiz::{QuizEngine, QuizRequest};
pub use reference::ReferenceLookup;
pub use reminders::ReminderScheduler;
pub use settings::QuizSettings;
pub use time::Clock;
