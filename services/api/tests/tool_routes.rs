use api_lib::adapters::Rfc3339TimeParser;
use api_lib::config::Config;
use api_lib::web::{build_router, state::AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use exam_prep_core::{
    Clock, College, Difficulty, ExamInfo, InMemoryStore, NewQuestion, PortResult, QuizSession,
    StoreService, TimeParsingService,
};
use std::collections::BTreeMap;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const TOKEN: &str = "secret-token";
const PHONE: &str = "919876543210";

fn config() -> Arc<Config> {
    Arc::new(
        Config::from_lookup(|key| match key {
            "AUTH_TOKEN" => Some(TOKEN.to_string()),
            "MY_NUMBER" => Some(PHONE.to_string()),
            "TIME_PARSER_TIMEOUT_SECS" => Some("1".to_string()),
            _ => None,
        })
        .unwrap(),
    )
}

async fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    for (text, correct) in [("Unit of force?", 1), ("Unit of power?", 0)] {
        store
            .insert_question(NewQuestion {
                topic: "Physics".into(),
                difficulty: Difficulty::Easy,
                text: text.into(),
                choices: vec!["A".into(), "B".into(), "C".into()],
                correct_choice_index: correct,
                explanation: format!("{text} explained"),
            })
            .await
            .unwrap();
    }
    store
        .add_exam(ExamInfo {
            name: "JEE".into(),
            description: "Engineering entrance exam".into(),
            important_dates: BTreeMap::new(),
            pattern: BTreeMap::new(),
            syllabus: BTreeMap::from([(
                "Physics".into(),
                vec!["Mechanics".into(), "Optics".into()],
            )]),
            resources: BTreeMap::from([("Physics".into(), vec!["HC Verma".into()])]),
        })
        .unwrap();
    for (name, rank, marks) in [("IIT Bombay", 100, 280.0), ("NIT Trichy", 1000, 220.0)] {
        store
            .add_college(College {
                exam: "JEE".into(),
                name: name.into(),
                cutoff_rank: rank,
                cutoff_marks: marks,
                fees: String::new(),
                location: "India".into(),
            })
            .unwrap();
    }
    store
}

fn app(store: Arc<InMemoryStore>, parser: Arc<dyn TimeParsingService>) -> Router {
    build_router(Arc::new(AppState::new(config(), store, parser, Clock::System)))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn call(app: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/tools/call")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {TOKEN}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn health_is_public() {
    let app = app(seeded_store().await, Arc::new(Rfc3339TimeParser));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn tool_routes_fail_closed_without_the_bearer_token() {
    let app = app(seeded_store().await, Arc::new(Rfc3339TimeParser));

    let missing = Request::builder()
        .method("POST")
        .uri("/tools/call")
        .header("content-type", "application/json")
        .body(Body::from(json!({"tool": "validate"}).to_string()))
        .unwrap();
    let (status, body) = send(&app, missing).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "unauthorized");

    let wrong = Request::builder()
        .uri("/tools")
        .header("authorization", "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn lists_tools_and_validates() {
    let app = app(seeded_store().await, Arc::new(Rfc3339TimeParser));

    let request = Request::builder()
        .uri("/tools")
        .header("authorization", format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 15);

    let (status, body) = call(&app, json!({"tool": "validate"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"tool": "validate", "result": PHONE}));
}

#[tokio::test]
async fn quiz_is_generated_graded_and_tracked() {
    let store = seeded_store().await;
    let app = app(store.clone(), Arc::new(Rfc3339TimeParser));

    let (status, body) = call(
        &app,
        json!({"tool": "generate_quiz", "arguments": {"topic": "physics", "count": 5}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let quiz = &body["result"];
    assert_eq!(quiz["partial"], true);
    assert_eq!(quiz["topic"], "Physics");
    let questions = quiz["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    for question in questions {
        assert!(question.get("correct_choice_index").is_none());
        assert!(question.get("explanation").is_none());
    }

    let question_id = questions[0]["question_id"].as_i64().unwrap();
    let answer_key = store
        .get_question(question_id)
        .await
        .unwrap()
        .unwrap()
        .correct_choice_index;
    let (status, body) = call(
        &app,
        json!({"tool": "check_answer", "arguments": {
            "session_id": quiz["session_id"],
            "question_index": 0,
            "chosen_choice_index": answer_key,
        }}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["correct"], true);
    assert_eq!(body["result"]["current_streak"], 1);

    let (status, body) = call(&app, json!({"tool": "get_progress", "arguments": {}})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["user_id"], PHONE);
    assert_eq!(body["result"]["total_count"], 1);
    assert_eq!(body["result"]["correct_count"], 1);
}

#[tokio::test]
async fn core_errors_become_status_codes() {
    let store = seeded_store().await;
    let app = app(store.clone(), Arc::new(Rfc3339TimeParser));

    let (status, body) = call(
        &app,
        json!({"tool": "generate_quiz", "arguments": {"topic": "Astrology"}}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "unknown_topic");

    let (status, body) = call(
        &app,
        json!({"tool": "generate_quiz", "arguments": {"topic": "Physics", "difficulty": "brutal"}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_argument");

    let (status, body) = call(
        &app,
        json!({"tool": "check_answer", "arguments": {
            "session_id": Uuid::new_v4(), "question_index": 0, "chosen_choice_index": 0,
        }}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "session_not_found");

    let (_, body) = call(
        &app,
        json!({"tool": "daily_question", "arguments": {"topic": "Physics"}}),
    )
    .await;
    let session_id = body["result"]["session_id"].clone();
    let (status, body) = call(
        &app,
        json!({"tool": "check_answer", "arguments": {
            "session_id": session_id, "question_index": 1, "chosen_choice_index": 0,
        }}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "index_out_of_range");

    let now = Utc::now();
    let expired = QuizSession {
        id: Uuid::new_v4(),
        user_id: PHONE.into(),
        topic: "Physics".into(),
        question_ids: vec![1],
        created_at: now - Duration::hours(25),
        expires_at: now - Duration::hours(1),
    };
    store.insert_session(&expired).await.unwrap();
    let (status, body) = call(
        &app,
        json!({"tool": "check_answer", "arguments": {
            "session_id": expired.id, "question_index": 0, "chosen_choice_index": 0,
        }}),
    )
    .await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(error_code(&body), "session_expired");

    let (status, body) = call(
        &app,
        json!({"tool": "get_exam_info", "arguments": {"exam_name": "GATE"}}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "exam_not_found");
}

#[tokio::test]
async fn malformed_calls_are_unprocessable() {
    let app = app(seeded_store().await, Arc::new(Rfc3339TimeParser));

    let (status, body) = call(&app, json!({"tool": "predict_weather"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "unknown_tool");

    let (status, body) = call(&app, json!({"tool": "check_answer", "arguments": {}})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "malformed_request");

    let request = Request::builder()
        .method("POST")
        .uri("/tools/call")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {TOKEN}"))
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert!(status.is_client_error());
    assert_eq!(error_code(&body), "malformed_request");
}

#[tokio::test]
async fn reminders_can_be_set_listed_and_cancelled() {
    let app = app(seeded_store().await, Arc::new(Rfc3339TimeParser));
    let fire_at = (Utc::now() + Duration::hours(2)).to_rfc3339();

    let (status, body) = call(
        &app,
        json!({"tool": "set_reminder", "arguments": {"when": fire_at, "message": "Revise optics"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["status"], "pending");
    let reminder_id = body["result"]["id"].as_i64().unwrap();

    let (_, body) = call(&app, json!({"tool": "list_reminders"})).await;
    assert_eq!(body["result"].as_array().unwrap().len(), 1);

    let cancel = json!({"tool": "cancel_reminder", "arguments": {"reminder_id": reminder_id}});
    let (status, _) = call(&app, cancel.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&app, cancel).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "reminder_not_found");

    let (status, body) = call(
        &app,
        json!({"tool": "set_reminder", "arguments": {"when": "someday", "message": "Mock test"}}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "time_parse");
}

#[tokio::test]
async fn study_plans_colleges_and_topics_are_served() {
    let app = app(seeded_store().await, Arc::new(Rfc3339TimeParser));

    let (status, body) = call(
        &app,
        json!({"tool": "generate_study_plan", "arguments": {
            "exam_name": "jee",
            "start_date": "2025-02-01",
            "end_date": "2025-02-11",
            "weak_areas": ["Optics"],
        }}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let plan = &body["result"];
    assert_eq!(plan["exam"], "JEE");
    assert_eq!(plan["hours_per_day"], 2);
    assert_eq!(plan["days"].as_array().unwrap().len(), 10);
    assert_eq!(plan["revision_days"][0], "2025-02-04");
    assert_eq!(plan["days"][0]["resources"], json!(["HC Verma"]));

    let (status, body) = call(
        &app,
        json!({"tool": "generate_study_plan", "arguments": {
            "exam_name": "JEE", "start_date": "2025-02-11", "end_date": "2025-02-01",
        }}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_argument");

    let (status, body) = call(
        &app,
        json!({"tool": "predict_colleges", "arguments": {"exam_name": "JEE", "expected_rank": 500}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"].as_array().unwrap().len(), 1);
    assert_eq!(body["result"][0]["name"], "NIT Trichy");

    let (status, body) = call(
        &app,
        json!({"tool": "predict_colleges", "arguments": {"exam_name": "GATE"}}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "exam_not_found");

    let (status, body) = call(&app, json!({"tool": "list_topics"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!(["Physics"]));
}

struct StalledParser;

#[async_trait]
impl TimeParsingService for StalledParser {
    async fn parse_time(&self, _text: &str, now: DateTime<Utc>) -> PortResult<DateTime<Utc>> {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        Ok(now + Duration::hours(1))
    }
}

#[tokio::test]
async fn slow_time_parser_times_out() {
    let app = app(seeded_store().await, Arc::new(StalledParser));
    let (status, body) = call(
        &app,
        json!({"tool": "set_reminder", "arguments": {"when": "in an hour", "message": "Break"}}),
    )
    .await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(error_code(&body), "time_parser_timeout");
}
