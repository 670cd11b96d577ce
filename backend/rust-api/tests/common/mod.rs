#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower::ServiceExt;

use tilmaster_api::models::{AnswerValue, ExerciseDef, ExerciseKind};
use tilmaster_api::repositories::memory::MemoryStore;
use tilmaster_api::{create_router, AppState, Config};

/// Router over an in-memory store seeded with the standard fixture
/// exercises. The store handle is returned for direct assertions on
/// persisted attempts and progress.
pub async fn create_test_app() -> (Router, MemoryStore) {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let store = MemoryStore::new();
    seed_exercises(&store);

    let app_state = Arc::new(AppState::in_memory(Config::standalone(), &store));
    (create_router(app_state), store)
}

pub fn exercise(id: &str, kind: ExerciseKind, correct: AnswerValue) -> ExerciseDef {
    ExerciseDef {
        id: id.to_string(),
        kind,
        question: "savol".to_string(),
        correct_answer: correct,
        options: None,
        explanation: None,
        tags: vec![],
        audio_ref: None,
        difficulty: Some("easy".to_string()),
        active: true,
    }
}

fn seed_exercises(store: &MemoryStore) {
    let mut mc = exercise(
        "mc-sum",
        ExerciseKind::MultipleChoice,
        AnswerValue::Text("B".to_string()),
    );
    mc.options = Some(BTreeMap::from([
        ("A".to_string(), "3".to_string()),
        ("B".to_string(), "4".to_string()),
    ]));
    mc.explanation = Some("2 + 2 = 4".to_string());
    store.seed_exercise(mc);

    store.seed_exercise(exercise(
        "tf-plural",
        ExerciseKind::TrueFalse,
        AnswerValue::Flag(true),
    ));

    store.seed_exercise(exercise(
        "fib-greeting",
        ExerciseKind::FillInBlank,
        AnswerValue::Texts(vec!["salom".to_string(), "assalom".to_string()]),
    ));

    store.seed_exercise(exercise(
        "match-letters",
        ExerciseKind::Matching,
        AnswerValue::Pairs(BTreeMap::from([
            ("1".to_string(), "a".to_string()),
            ("2".to_string(), "b".to_string()),
            ("3".to_string(), "c".to_string()),
        ])),
    ));

    store.seed_exercise(exercise(
        "dict-school",
        ExerciseKind::Dictation,
        AnswerValue::Text("men maktabga bordim".to_string()),
    ));

    store.seed_exercise(exercise(
        "sa-vocab",
        ExerciseKind::ShortAnswer,
        AnswerValue::Text("o'qituvchi".to_string()),
    ));

    store.seed_exercise(exercise(
        "tr-apple",
        ExerciseKind::Translation,
        AnswerValue::Text("men olma yeyman".to_string()),
    ));

    store.seed_exercise(exercise(
        "listen-school",
        ExerciseKind::Listening,
        AnswerValue::Text("men maktabga bordim".to_string()),
    ));

    store.seed_exercise(exercise(
        "speak-student",
        ExerciseKind::Speaking,
        AnswerValue::Text("men talabaman".to_string()),
    ));

    let mut retired = exercise(
        "retired-1",
        ExerciseKind::ShortAnswer,
        AnswerValue::Text("anor".to_string()),
    );
    retired.active = false;
    store.seed_exercise(retired);
}

pub async fn post_json(
    app: Router,
    uri: &str,
    user_id: Option<&str>,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user_id) = user_id {
        builder = builder.header("x-user-id", user_id);
    }

    let response = app
        .oneshot(
            builder
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn get_json(
    app: Router,
    uri: &str,
    user_id: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user_id) = user_id {
        builder = builder.header("x-user-id", user_id);
    }

    let response = app
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
