//! services/api/src/adapters/seed.rs
//!
//! Sample question bank and reference material, loaded into empty tables on startup.

use exam_prep_core::domain::{Difficulty, ExamInfo, NewQuestion};
use exam_prep_core::ports::StoreService;
use std::collections::BTreeMap;
use tracing::info;

use super::db::DbAdapter;
use crate::error::ApiError;

/// Rows inserted by `seed_sample_data`, per table.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub exams: usize,
    pub questions: usize,
    pub notes: usize,
    pub formulas: usize,
}

struct SampleQuestion {
    topic: &'static str,
    difficulty: Difficulty,
    text: &'static str,
    choices: [&'static str; 4],
    correct: usize,
    explanation: &'static str,
}

const QUESTIONS: &[SampleQuestion] = &[
    SampleQuestion {
        topic: "Physics",
        difficulty: Difficulty::Easy,
        text: "What is the SI unit of force?",
        choices: ["Newton", "Joule", "Watt", "Pascal"],
        correct: 0,
        explanation: "Force is measured in Newtons (N) in the SI system.",
    },
    SampleQuestion {
        topic: "Physics",
        difficulty: Difficulty::Medium,
        text: "A body moving in a circle at constant speed has",
        choices: [
            "zero acceleration",
            "acceleration towards the centre",
            "acceleration along the tangent",
            "acceleration away from the centre",
        ],
        correct: 1,
        explanation: "Uniform circular motion needs a centripetal acceleration v^2/r pointing to the centre.",
    },
    SampleQuestion {
        topic: "Physics",
        difficulty: Difficulty::Hard,
        text: "The escape velocity from Earth's surface is about",
        choices: ["7.9 km/s", "11.2 km/s", "3.0 km/s", "42.1 km/s"],
        correct: 1,
        explanation: "v = sqrt(2GM/R), which is roughly 11.2 km/s for Earth.",
    },
    SampleQuestion {
        topic: "Chemistry",
        difficulty: Difficulty::Easy,
        text: "What is the charge of a proton?",
        choices: ["+1", "0", "-1", "+2"],
        correct: 0,
        explanation: "A proton carries a +1 elementary charge.",
    },
    SampleQuestion {
        topic: "Chemistry",
        difficulty: Difficulty::Medium,
        text: "Which gas is evolved when zinc reacts with dilute hydrochloric acid?",
        choices: ["Oxygen", "Chlorine", "Hydrogen", "Carbon dioxide"],
        correct: 2,
        explanation: "Zn + 2HCl -> ZnCl2 + H2.",
    },
    SampleQuestion {
        topic: "Mathematics",
        difficulty: Difficulty::Easy,
        text: "Derivative of x^2 is?",
        choices: ["x", "2x", "x^2", "2"],
        correct: 1,
        explanation: "Using power rule d/dx(x^n) = n*x^(n-1), so derivative is 2x.",
    },
    SampleQuestion {
        topic: "Mathematics",
        difficulty: Difficulty::Medium,
        text: "What is the integral of 1/x dx?",
        choices: ["x^2/2 + C", "ln|x| + C", "-1/x^2 + C", "e^x + C"],
        correct: 1,
        explanation: "d/dx ln|x| = 1/x, so the antiderivative of 1/x is ln|x| + C.",
    },
    SampleQuestion {
        topic: "Biology",
        difficulty: Difficulty::Easy,
        text: "Which organelle is known as the powerhouse of the cell?",
        choices: ["Nucleus", "Ribosome", "Mitochondrion", "Golgi apparatus"],
        correct: 2,
        explanation: "Mitochondria produce most of the cell's ATP through respiration.",
    },
];

const NOTES: &[(&str, &str, &str)] = &[
    ("Physics", "Kinematics", "Velocity is rate of change of displacement."),
    ("Physics", "Kinematics", "Acceleration is rate of change of velocity."),
    (
        "Chemistry",
        "Periodic Table",
        "Elements are arranged in order of increasing atomic number.",
    ),
];

const FORMULAS: &[(&str, &str, &str, &str)] = &[
    ("Physics", "Dynamics", "F = m a", "Force equals mass times acceleration."),
    ("Physics", "Kinematics", "v^2 = u^2 + 2 a s", "Velocity after covering distance s."),
    ("Mathematics", "Geometry", "A = π r^2", "Area of a circle."),
];

fn map<const N: usize>(entries: [(&str, &str); N]) -> BTreeMap<String, String> {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn by_subject(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(subject, topics)| {
            (
                subject.to_string(),
                topics.iter().map(|t| t.to_string()).collect(),
            )
        })
        .collect()
}

fn sample_exams() -> Vec<ExamInfo> {
    vec![
        ExamInfo {
            name: "JEE".to_string(),
            description: "Engineering entrance exam for IITs, NITs, and other colleges".to_string(),
            important_dates: map([("mains", "2025-01-24"), ("advanced", "2025-05-25")]),
            pattern: map([
                ("duration", "3 hours"),
                ("questions", "75 (25 per subject)"),
                ("marking", "+4 for correct, -1 for incorrect"),
            ]),
            syllabus: by_subject(&[
                (
                    "Physics",
                    ["Mechanics", "Electrodynamics", "Thermodynamics", "Optics", "Modern Physics"].as_slice(),
                ),
                (
                    "Chemistry",
                    ["Physical Chemistry", "Organic Chemistry", "Inorganic Chemistry"].as_slice(),
                ),
                (
                    "Mathematics",
                    ["Algebra", "Calculus", "Coordinate Geometry", "Trigonometry"].as_slice(),
                ),
            ]),
            resources: by_subject(&[
                ("Physics", ["HC Verma", "Irodov", "NCERT"].as_slice()),
                ("Chemistry", ["OP Tandon", "MS Chouhan", "NCERT"].as_slice()),
                ("Mathematics", ["RD Sharma", "Arihant", "NCERT"].as_slice()),
            ]),
        },
        ExamInfo {
            name: "NEET".to_string(),
            description: "Medical entrance exam for MBBS/BDS courses".to_string(),
            important_dates: map([("registration", "2024-03-01"), ("exam", "2024-05-05")]),
            pattern: map([
                ("duration", "3 hours 20 minutes"),
                ("questions", "180 (45 per subject)"),
                ("marking", "+4 for correct, -1 for incorrect"),
            ]),
            syllabus: by_subject(&[
                ("Physics", ["Mechanics", "Optics", "Thermodynamics"].as_slice()),
                ("Chemistry", ["Organic", "Inorganic", "Physical"].as_slice()),
                ("Biology", ["Botany", "Zoology"].as_slice()),
            ]),
            resources: by_subject(&[
                ("Physics", ["NCERT", "DC Pandey"].as_slice()),
                ("Chemistry", ["NCERT", "Morrison Boyd"].as_slice()),
                ("Biology", ["NCERT", "Trueman"].as_slice()),
            ]),
        },
    ]
}

async fn is_empty(db: &DbAdapter, table: &str) -> Result<bool, ApiError> {
    let sql = format!("SELECT COUNT(*) FROM {table}");
    let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(db.pool()).await?;
    Ok(count == 0)
}

impl DbAdapter {
    /// Loads the sample data into every table that is still empty.
    pub async fn seed_sample_data(&self) -> Result<SeedReport, ApiError> {
        let mut report = SeedReport::default();

        if is_empty(self, "exam_info").await? {
            for exam in sample_exams() {
                sqlx::query(
                    "INSERT INTO exam_info
                         (name, description, important_dates, pattern, syllabus, resources)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .bind(&exam.name)
                .bind(&exam.description)
                .bind(serde_json::to_string(&exam.important_dates)?)
                .bind(serde_json::to_string(&exam.pattern)?)
                .bind(serde_json::to_string(&exam.syllabus)?)
                .bind(serde_json::to_string(&exam.resources)?)
                .execute(self.pool())
                .await?;
                report.exams += 1;
            }
        }

        if is_empty(self, "questions").await? {
            for q in QUESTIONS {
                self.insert_question(NewQuestion {
                    topic: q.topic.to_string(),
                    difficulty: q.difficulty,
                    text: q.text.to_string(),
                    choices: q.choices.iter().map(|c| c.to_string()).collect(),
                    correct_choice_index: q.correct,
                    explanation: q.explanation.to_string(),
                })
                .await?;
                report.questions += 1;
            }
        }

        if is_empty(self, "notes").await? {
            for (topic, subtopic, note) in NOTES {
                sqlx::query("INSERT INTO notes (topic, subtopic, note) VALUES (?1, ?2, ?3)")
                    .bind(*topic)
                    .bind(*subtopic)
                    .bind(*note)
                    .execute(self.pool())
                    .await?;
                report.notes += 1;
            }
        }

        if is_empty(self, "formulas").await? {
            for (topic, subtopic, formula, description) in FORMULAS {
                sqlx::query(
                    "INSERT INTO formulas (topic, subtopic, formula, description)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .bind(*topic)
                .bind(*subtopic)
                .bind(*formula)
                .bind(*description)
                .execute(self.pool())
                .await?;
                report.formulas += 1;
            }
        }

        if is_empty(self, "colleges").await? {
            for (exam, name, rank, marks, fees, location) in COLLEGES {
                sqlx::query(
                    "INSERT INTO colleges (exam, name, cutoff_rank, cutoff_marks, fees, location)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .bind(*exam)
                .bind(*name)
                .bind(*rank)
                .bind(*marks)
                .bind(*fees)
                .bind(*location)
                .execute(self.pool())
                .await?;
                report.colleges += 1;
            }
        }

        info!(?report, "Sample data seeded");
        Ok(report)
    }
}
