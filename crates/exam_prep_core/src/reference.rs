//! crates/exam_prep_core/src/reference.rs
//!
//! Read-only lookups over exam information, notes, formulas and colleges, plus
//! the study plans built from an exam's syllabus.

use std::sync::Arc;

use tracing::debug;

use crate::domain::{College, ExamInfo, Formula, Note, StudyPlan};
use crate::error::{ToolError, ToolResult};
use crate::planning::{build_study_plan, shortlist_colleges, CollegeQuery, StudyPlanRequest};
use crate::ports::StoreService;

#[derive(Clone)]
pub struct ReferenceLookup {
    store: Arc<dyn StoreService>,
}

impl ReferenceLookup {
    pub fn new(store: Arc<dyn StoreService>) -> Self {
        Self { store }
    }

    pub async fn exams(&self) -> ToolResult<Vec<String>> {
        Ok(self.store.list_exams().await?)
    }

    pub async fn exam_info(&self, name: &str) -> ToolResult<ExamInfo> {
        let name = name.trim();
        self.store
            .get_exam_info(name)
            .await?
            .ok_or_else(|| ToolError::ExamNotFound(name.to_string()))
    }

    pub async fn notes(&self, topic: &str, subtopic: Option<&str>) -> ToolResult<Vec<Note>> {
        let subtopic = subtopic.map(str::trim).filter(|s| !s.is_empty());
        Ok(self.store.get_notes(topic.trim(), subtopic).await?)
    }

    pub async fn formulas(&self, topic: &str) -> ToolResult<Vec<Formula>> {
        Ok(self.store.get_formulas(topic.trim()).await?)
    }

    /// A day-by-day schedule over the exam's syllabus, weighted toward weak areas.
    pub async fn study_plan(&self, request: StudyPlanRequest) -> ToolResult<StudyPlan> {
        let exam = self.exam_info(&request.exam_name).await?;
        let plan = build_study_plan(&exam, &request)?;
        debug!(
            exam = %plan.exam,
            days = plan.days.len(),
            revision_days = plan.revision_days.len(),
            "Built study plan"
        );
        Ok(plan)
    }

    pub async fn predict_colleges(&self, query: CollegeQuery) -> ToolResult<Vec<College>> {
        let exam = self.exam_info(&query.exam_name).await?;
        let colleges = self.store.colleges_for_exam(&exam.name).await?;
        shortlist_colleges(colleges, &query)
    }
}
