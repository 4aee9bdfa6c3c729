//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use exam_prep_core::{
    AnswerChecker, Clock, ProgressTracker, QuizEngine, ReferenceLookup, ReminderScheduler,
    StoreService, TimeParsingService,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn StoreService>,
    pub quiz: QuizEngine,
    pub checker: AnswerChecker,
    pub progress: ProgressTracker,
    pub reminders: ReminderScheduler,
    pub reference: ReferenceLookup,
}

impl AppState {
    /// Wires every core component to the same store and clock.
    pub fn new(
        config: Arc<Config>,
        db: Arc<dyn StoreService>,
        time_parser: Arc<dyn TimeParsingService>,
        clock: Clock,
    ) -> Self {
        let settings = config.quiz_settings();
        Self {
            quiz: QuizEngine::new(db.clone(), clock, settings),
            checker: AnswerChecker::new(db.clone(), clock, settings),
            progress: ProgressTracker::new(db.clone(), clock, settings),
            reminders: ReminderScheduler::new(db.clone(), time_parser, clock),
            reference: ReferenceLookup::new(db.clone()),
            config,
            db,
        }
    }
}
