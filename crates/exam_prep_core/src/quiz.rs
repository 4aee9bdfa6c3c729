//! crates/exam_prep_core/src/quiz.rs
//!
//! Quiz generation: picks questions for a topic, stores the session with its
//! answer key server-side, and hands back only what the caller may see.

use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{Difficulty, Question, QuizItem, QuizSession, QuizView};
use crate::error::{ToolError, ToolResult};
use crate::ports::StoreService;
use crate::settings::QuizSettings;
use crate::time::Clock;

/// Arguments of `generate_quiz`.
#[derive(Debug, Clone)]
pub struct QuizRequest {
    pub user_id: String,
    pub topic: String,
    pub difficulty: Option<Difficulty>,
    pub count: usize,
}

/// The questions picked for one quiz, before a session is built around them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub questions: Vec<Question>,
    pub partial: bool,
    pub difficulty_relaxed: bool,
}

/// Draws up to `count` distinct questions uniformly at random.
///
/// The difficulty filter is dropped when it matches nothing, so a rare topic
/// still yields a quiz instead of an empty one.
pub fn select_questions<R: Rng + ?Sized>(
    pool: Vec<Question>,
    difficulty: Option<Difficulty>,
    count: usize,
    rng: &mut R,
) -> Selection {
    let (candidates, difficulty_relaxed) = match difficulty {
        Some(wanted) => {
            let matching: Vec<Question> = pool
                .iter()
                .filter(|q| q.difficulty == wanted)
                .cloned()
                .collect();
            if matching.is_empty() {
                (pool, true)
            } else {
                (matching, false)
            }
        }
        None => (pool, false),
    };

    let take = count.min(candidates.len());
    let picked = rand::seq::index::sample(rng, candidates.len(), take);
    let questions = picked.iter().map(|i| candidates[i].clone()).collect();

    Selection {
        questions,
        partial: take < count,
        difficulty_relaxed,
    }
}

#[derive(Clone)]
pub struct QuizEngine {
    store: Arc<dyn StoreService>,
    clock: Clock,
    settings: QuizSettings,
}

impl QuizEngine {
    pub fn new(store: Arc<dyn StoreService>, clock: Clock, settings: QuizSettings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    pub async fn generate_quiz(&self, request: QuizRequest) -> ToolResult<QuizView> {
        if request.count == 0 {
            return Err(ToolError::InvalidArgument(
                "count must be at least 1".to_string(),
            ));
        }

        let topic = request.topic.trim();
        let pool = self.store.questions_for_topic(topic).await?;
        if pool.is_empty() {
            return Err(ToolError::UnknownTopic(topic.to_string()));
        }
        // Report the topic the way the question bank spells it.
        let canonical_topic = pool[0].topic.clone();

        let selection = {
            let mut rng = rand::rng();
            select_questions(pool, request.difficulty, request.count, &mut rng)
        };
        debug!(
            topic = %canonical_topic,
            picked = selection.questions.len(),
            requested = request.count,
            "Selected quiz questions"
        );

        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(self.settings.session_ttl)
            .ok_or_else(|| {
                ToolError::InvalidArgument("session lifetime reaches past the calendar".to_string())
            })?;
        let session = QuizSession {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            topic: canonical_topic,
            question_ids: selection.questions.iter().map(|q| q.id).collect(),
            created_at: now,
            expires_at,
        };
        self.store.insert_session(&session).await?;
        info!(
            session_id = %session.id,
            user_id = %session.user_id,
            questions = session.question_ids.len(),
            "Quiz session created"
        );

        let questions = selection
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| QuizItem::from_question(index, question))
            .collect();

        Ok(QuizView {
            session_id: session.id,
            topic: session.topic,
            difficulty: request.difficulty,
            partial: selection.partial,
            difficulty_relaxed: selection.difficulty_relaxed,
            expires_at: session.expires_at,
            questions,
        })
    }

    /// A single random medium question on a topic, wrapped in its own gradable session.
    pub async fn daily_question(&self, user_id: &str, topic: &str) -> ToolResult<QuizView> {
        self.generate_quiz(QuizRequest {
            user_id: user_id.to_string(),
            topic: topic.to_string(),
            difficulty: Some(Difficulty::Medium),
            count: 1,
        })
        .await
    }

    /// Lists topics that have at least one question.
    pub async fn topics(&self) -> ToolResult<Vec<String>> {
        Ok(self.store.list_topics().await?)
    }
}
