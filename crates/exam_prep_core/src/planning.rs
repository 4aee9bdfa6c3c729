//! crates/exam_prep_core/src/planning.rs
//!
//! Study plan scheduling and the college shortlist. Both are pure functions over
//! reference data; `ReferenceLookup` loads that data and calls into here.

use chrono::NaiveDate;

use crate::domain::{College, ExamInfo, StudyDay, StudyPlan};
use crate::error::{ToolError, ToolResult};

/// Longest plan that will be scheduled, in days.
pub const MAX_PLAN_DAYS: i64 = 366;
/// How many closing days are handed over to revision, at most.
pub const REVISION_DAYS: i64 = 7;
/// Most colleges returned by one prediction.
pub const MAX_COLLEGES: usize = 10;

const WEAK_WEIGHT: usize = 3;
const NORMAL_WEIGHT: usize = 2;
const STRONG_WEIGHT: usize = 1;

/// Arguments of `generate_study_plan`.
#[derive(Debug, Clone)]
pub struct StudyPlanRequest {
    pub exam_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub hours_per_day: u32,
    pub weak_areas: Vec<String>,
    pub strong_areas: Vec<String>,
}

/// Arguments of `predict_colleges`. Absent criteria do not filter.
#[derive(Debug, Clone, Default)]
pub struct CollegeQuery {
    pub exam_name: String,
    pub expected_rank: Option<u32>,
    pub expected_marks: Option<f64>,
    pub preferred_location: Option<String>,
}

#[derive(Clone, Copy)]
struct PlanTopic<'a> {
    subject: &'a str,
    topic: &'a str,
    weight: usize,
}

fn matches_any(areas: &[String], subject: &str, topic: &str) -> bool {
    areas
        .iter()
        .map(|a| a.trim())
        .any(|area| area.eq_ignore_ascii_case(topic) || area.eq_ignore_ascii_case(subject))
}

/// Orders syllabus topics so each appears once per round it is weighted for.
///
/// Weak topics come up three times per cycle, untouched ones twice and strong
/// ones once. Rounds are interleaved, so a weak topic is not studied on
/// consecutive days unless it is the only one left.
fn rotation<'a>(exam: &'a ExamInfo, weak: &[String], strong: &[String]) -> Vec<PlanTopic<'a>> {
    let mut topics = Vec::new();
    for (subject, names) in &exam.syllabus {
        for topic in names {
            let weight = if matches_any(weak, subject, topic) {
                WEAK_WEIGHT
            } else if matches_any(strong, subject, topic) {
                STRONG_WEIGHT
            } else {
                NORMAL_WEIGHT
            };
            topics.push(PlanTopic {
                subject: subject.as_str(),
                topic: topic.as_str(),
                weight,
            });
        }
    }

    let mut order = Vec::new();
    for round in 0..WEAK_WEIGHT {
        order.extend(topics.iter().filter(|t| t.weight > round).copied());
    }
    order
}

fn study_day(
    exam: &ExamInfo,
    date: NaiveDate,
    hours: u32,
    entry: Option<&PlanTopic<'_>>,
) -> StudyDay {
    let study_hours = f64::from(hours) * 0.6;
    let practice_hours = f64::from(hours) * 0.4;
    match entry {
        Some(entry) => {
            let label = format!("{}: {}", entry.subject, entry.topic);
            let resources = exam
                .resources
                .get(entry.subject)
                .cloned()
                .unwrap_or_else(|| vec!["General resources".to_string()]);
            StudyDay {
                date,
                activities: vec![
                    format!("Study {label} for {study_hours:.1} hours"),
                    format!("Practice questions for {practice_hours:.1} hours"),
                ],
                topic: label,
                subject: Some(entry.subject.to_string()),
                hours,
                resources,
            }
        }
        None => StudyDay {
            date,
            topic: "General preparation".to_string(),
            subject: None,
            hours,
            activities: vec![
                format!("Study for {study_hours:.1} hours"),
                format!("Practice questions for {practice_hours:.1} hours"),
            ],
            resources: vec!["General resources".to_string()],
        },
    }
}

fn revision_day(date: NaiveDate, hours: u32) -> StudyDay {
    StudyDay {
        date,
        topic: "Revision".to_string(),
        subject: None,
        hours,
        activities: vec![
            "Review all notes".to_string(),
            "Solve previous year papers".to_string(),
            "Take mock test".to_string(),
        ],
        resources: Vec::new(),
    }
}

/// Lays out one entry per day from `start_date` up to `end_date`.
///
/// The last `min(7, days - 1)` days are revision days; the rest follow the
/// weighted topic rotation. The first day is always a study day.
pub fn build_study_plan(exam: &ExamInfo, request: &StudyPlanRequest) -> ToolResult<StudyPlan> {
    let total_days = (request.end_date - request.start_date).num_days();
    if total_days <= 0 {
        return Err(ToolError::InvalidArgument(
            "end_date must be after start_date".to_string(),
        ));
    }
    if total_days > MAX_PLAN_DAYS {
        return Err(ToolError::InvalidArgument(format!(
            "a study plan can cover at most {MAX_PLAN_DAYS} days"
        )));
    }
    if !(1..=24).contains(&request.hours_per_day) {
        return Err(ToolError::InvalidArgument(
            "hours_per_day must be between 1 and 24".to_string(),
        ));
    }

    let revision_count = REVISION_DAYS.min(total_days - 1);
    let study_count = total_days - revision_count;
    let rotation = rotation(exam, &request.weak_areas, &request.strong_areas);

    let mut days = Vec::new();
    let mut revision_days = Vec::new();
    for (offset, date) in (0..total_days).zip(request.start_date.iter_days()) {
        if offset < study_count {
            let entry = match rotation.len() {
                0 => None,
                len => rotation.get(offset as usize % len),
            };
            days.push(study_day(exam, date, request.hours_per_day, entry));
        } else {
            days.push(revision_day(date, request.hours_per_day));
            revision_days.push(date);
        }
    }

    Ok(StudyPlan {
        exam: exam.name.clone(),
        start_date: request.start_date,
        end_date: request.end_date,
        hours_per_day: request.hours_per_day,
        days,
        revision_days,
    })
}

/// Colleges whose cutoffs the expected result clears, best-ranked first.
///
/// A college stays in when its closing rank is at or beyond the expected rank,
/// its cutoff marks are at or below the expected marks, and its location
/// contains the preferred one (ignoring case).
pub fn shortlist_colleges(
    mut colleges: Vec<College>,
    query: &CollegeQuery,
) -> ToolResult<Vec<College>> {
    if query.expected_rank == Some(0) {
        return Err(ToolError::InvalidArgument(
            "expected_rank must be at least 1".to_string(),
        ));
    }
    if let Some(marks) = query.expected_marks {
        if !marks.is_finite() || marks < 0.0 {
            return Err(ToolError::InvalidArgument(
                "expected_marks must be a non-negative number".to_string(),
            ));
        }
    }
    let location = query
        .preferred_location
        .as_deref()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty());

    colleges.retain(|college| {
        query.expected_rank.map_or(true, |rank| college.cutoff_rank >= rank)
            && query.expected_marks.map_or(true, |marks| college.cutoff_marks <= marks)
            && location
                .as_deref()
                .map_or(true, |l| college.location.to_lowercase().contains(l))
    });
    colleges.sort_by(|a, b| {
        a.cutoff_rank
            .cmp(&b.cutoff_rank)
            .then_with(|| a.name.cmp(&b.name))
    });
    colleges.truncate(MAX_COLLEGES);
    Ok(colleges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn exam() -> ExamInfo {
        ExamInfo {
            name: "JEE".into(),
            description: String::new(),
            important_dates: BTreeMap::new(),
            pattern: BTreeMap::new(),
            syllabus: BTreeMap::from([
                ("Chemistry".into(), vec!["Organic".into()]),
                ("Physics".into(), vec!["Mechanics".into(), "Optics".into()]),
            ]),
            resources: BTreeMap::from([("Physics".into(), vec!["HC Verma".into()])]),
        }
    }

    fn request(start: NaiveDate, end: NaiveDate) -> StudyPlanRequest {
        StudyPlanRequest {
            exam_name: "JEE".into(),
            start_date: start,
            end_date: end,
            hours_per_day: 5,
            weak_areas: Vec::new(),
            strong_areas: Vec::new(),
        }
    }

    fn college(name: &str, rank: u32, marks: f64, location: &str) -> College {
        College {
            exam: "JEE".into(),
            name: name.into(),
            cutoff_rank: rank,
            cutoff_marks: marks,
            fees: String::new(),
            location: location.into(),
        }
    }

    #[test]
    fn plan_covers_every_day_and_ends_with_revision() {
        let plan = build_study_plan(&exam(), &request(day(1, 1), day(1, 31))).unwrap();
        assert_eq!(plan.days.len(), 30);
        assert_eq!(plan.days[0].date, day(1, 1));
        assert_eq!(plan.days[29].date, day(1, 30));
        assert_eq!(
            plan.revision_days,
            (24..=30).map(|d| day(1, d)).collect::<Vec<_>>()
        );
        assert!(plan.days[23..].iter().all(|d| d.topic == "Revision"));
        assert!(plan.days[..23].iter().all(|d| d.topic != "Revision"));
    }

    #[test]
    fn study_days_carry_subject_resources() {
        let plan = build_study_plan(&exam(), &request(day(1, 1), day(1, 31))).unwrap();
        let physics = plan
            .days
            .iter()
            .find(|d| d.subject.as_deref() == Some("Physics"))
            .unwrap();
        assert_eq!(physics.resources, vec!["HC Verma".to_string()]);
        assert_eq!(physics.activities[0], format!("Study {} for 3.0 hours", physics.topic));
        let chemistry = plan
            .days
            .iter()
            .find(|d| d.subject.as_deref() == Some("Chemistry"))
            .unwrap();
        assert_eq!(chemistry.resources, vec!["General resources".to_string()]);
    }

    #[test]
    fn weak_areas_get_more_days_than_strong_ones() {
        let mut req = request(day(1, 1), day(2, 1));
        req.weak_areas = vec!["optics".into()];
        req.strong_areas = vec!["Organic".into()];
        let plan = build_study_plan(&exam(), &req).unwrap();
        let count = |topic: &str| plan.days.iter().filter(|d| d.topic == topic).count();
        assert!(count("Physics: Optics") > count("Physics: Mechanics"));
        assert!(count("Physics: Mechanics") > count("Chemistry: Organic"));
    }

    #[test]
    fn short_plans_keep_one_study_day() {
        let plan = build_study_plan(&exam(), &request(day(1, 1), day(1, 2))).unwrap();
        assert_eq!(plan.days.len(), 1);
        assert!(plan.revision_days.is_empty());

        let plan = build_study_plan(&exam(), &request(day(1, 1), day(1, 4))).unwrap();
        assert_eq!(plan.revision_days, vec![day(1, 2), day(1, 3)]);
        assert_ne!(plan.days[0].topic, "Revision");
    }

    #[test]
    fn empty_syllabus_still_schedules_days() {
        let mut exam = exam();
        exam.syllabus.clear();
        let plan = build_study_plan(&exam, &request(day(1, 1), day(1, 10))).unwrap();
        assert_eq!(plan.days[0].topic, "General preparation");
        assert!(plan.days[0].subject.is_none());
    }

    #[test]
    fn invalid_plans_are_rejected() {
        let exam = exam();
        for req in [
            request(day(1, 5), day(1, 5)),
            request(day(1, 5), day(1, 1)),
            request(day(1, 1), NaiveDate::from_ymd_opt(2027, 1, 1).unwrap()),
            StudyPlanRequest {
                hours_per_day: 0,
                ..request(day(1, 1), day(1, 5))
            },
            StudyPlanRequest {
                hours_per_day: 25,
                ..request(day(1, 1), day(1, 5))
            },
        ] {
            let err = build_study_plan(&exam, &req).unwrap_err();
            assert!(matches!(err, ToolError::InvalidArgument(_)), "{req:?}");
        }
    }

    #[test]
    fn shortlist_applies_every_criterion() {
        let colleges = vec![
            college("IIT Delhi", 200, 270.0, "Delhi"),
            college("IIT Bombay", 100, 280.0, "Mumbai"),
            college("NIT Trichy", 1000, 220.0, "Tamil Nadu"),
        ];

        let all = shortlist_colleges(colleges.clone(), &CollegeQuery::default()).unwrap();
        assert_eq!(
            all.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["IIT Bombay", "IIT Delhi", "NIT Trichy"]
        );

        let query = CollegeQuery {
            expected_rank: Some(150),
            ..CollegeQuery::default()
        };
        let by_rank = shortlist_colleges(colleges.clone(), &query).unwrap();
        assert_eq!(by_rank.len(), 2);

        let query = CollegeQuery {
            expected_marks: Some(275.0),
            preferred_location: Some(" delhi ".into()),
            ..CollegeQuery::default()
        };
        let by_marks = shortlist_colleges(colleges, &query).unwrap();
        assert_eq!(by_marks.len(), 1);
        assert_eq!(by_marks[0].name, "IIT Delhi");
    }

    #[test]
    fn shortlist_is_capped() {
        let colleges = (1..=15)
            .map(|i| college(&format!("College {i:02}"), i * 10, 100.0, "Pune"))
            .collect();
        let shortlist = shortlist_colleges(colleges, &CollegeQuery::default()).unwrap();
        assert_eq!(shortlist.len(), MAX_COLLEGES);
        assert_eq!(shortlist[0].cutoff_rank, 10);
    }

    #[test]
    fn shortlist_rejects_nonsense_expectations() {
        for query in [
            CollegeQuery {
                expected_rank: Some(0),
                ..CollegeQuery::default()
            },
            CollegeQuery {
                expected_marks: Some(-1.0),
                ..CollegeQuery::default()
            },
            CollegeQuery {
                expected_marks: Some(f64::NAN),
                ..CollegeQuery::default()
            },
        ] {
            assert!(matches!(
                shortlist_colleges(Vec::new(), &query),
                Err(ToolError::InvalidArgument(_))
            ));
        }
    }
}
