mod common;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn correct_multiple_choice_answer() {
    let (app, store) = common::create_test_app().await;

    let (status, body) = common::post_json(
        app,
        "/api/v1/exercises/mc-sum/check-answer",
        Some("user-1"),
        json!({ "answer": "B" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_correct"], json!(true));
    assert_eq!(body["score"], json!(1.0));
    assert_eq!(body["feedback"]["general"], json!("✅ To'g'ri!"));
    assert_eq!(body["explanation"], json!("2 + 2 = 4"));

    assert_eq!(store.attempt_count(), 1);
    let progress = store.progress_snapshot("user-1").unwrap();
    assert_eq!(progress.exercises_completed, 1);
}

#[tokio::test]
async fn wrong_multiple_choice_answer_names_the_correct_option() {
    let (app, store) = common::create_test_app().await;

    let (status, body) = common::post_json(
        app,
        "/api/v1/exercises/mc-sum/check-answer",
        Some("user-1"),
        json!({ "answer": "A" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_correct"], json!(false));
    assert_eq!(body["score"], json!(0.0));
    assert_eq!(body["feedback"]["specific"]["To'g'ri javob"], json!("4"));

    // Wrong answers are still recorded, but do not count as completed.
    assert_eq!(store.attempt_count(), 1);
    assert_eq!(
        store.progress_snapshot("user-1").unwrap().exercises_completed,
        0
    );
}

#[tokio::test]
async fn option_outside_the_exercise_options_is_rejected() {
    let (app, store) = common::create_test_app().await;

    let (status, _) = common::post_json(
        app,
        "/api/v1/exercises/mc-sum/check-answer",
        Some("user-1"),
        json!({ "answer": "C" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    // Invalid input never reaches the attempt recorder.
    assert_eq!(store.attempt_count(), 0);
}

#[tokio::test]
async fn true_false_mismatch() {
    let (app, _) = common::create_test_app().await;

    let (status, body) = common::post_json(
        app,
        "/api/v1/exercises/tf-plural/check-answer",
        Some("user-1"),
        json!({ "answer": false }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_correct"], json!(false));
    assert_eq!(body["score"], json!(0.0));
}

#[tokio::test]
async fn fill_in_blank_normalizes_before_comparing() {
    let (app, _) = common::create_test_app().await;

    let (status, body) = common::post_json(
        app,
        "/api/v1/exercises/fib-greeting/check-answer",
        Some("user-1"),
        json!({ "answer": " Salom " }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_correct"], json!(true));
    assert_eq!(body["score"], json!(1.0));
}

#[tokio::test]
async fn matching_reports_per_pair_verdicts() {
    let (app, _) = common::create_test_app().await;

    let (status, body) = common::post_json(
        app,
        "/api/v1/exercises/match-letters/check-answer",
        Some("user-1"),
        json!({ "answer": { "1": "a", "2": "x", "3": "c" } }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_correct"], json!(false));
    let score = body["score"].as_f64().unwrap();
    assert!((score - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(
        body["feedback"]["specific"]["2"]["status"],
        json!("incorrect")
    );
}

#[tokio::test]
async fn dictation_exact_and_one_character_off() {
    let (app, _) = common::create_test_app().await;

    let (status, body) = common::post_json(
        app.clone(),
        "/api/v1/exercises/dict-school/check-answer",
        Some("user-1"),
        json!({ "answer": "men maktabga bordim" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_correct"], json!(true));
    assert_eq!(body["score"], json!(1.0));

    let (status, body) = common::post_json(
        app,
        "/api/v1/exercises/dict-school/check-answer",
        Some("user-1"),
        json!({ "answer": "men maktabg bordim" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_correct"], json!(true));
    let score = body["score"].as_f64().unwrap();
    let accuracy = 1.0 - 1.0 / 19.0;
    assert!((score - 0.8 * accuracy).abs() < 1e-9);
}

#[tokio::test]
async fn short_answer_near_miss_is_accepted_with_a_near_message() {
    let (app, _) = common::create_test_app().await;

    // One substitution in ten characters: similarity 0.9 ≥ 0.8.
    let (status, body) = common::post_json(
        app,
        "/api/v1/exercises/sa-vocab/check-answer",
        Some("user-1"),
        json!({ "answer": "o'qituvche" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_correct"], json!(true));
    assert_eq!(body["feedback"]["general"], json!("✅ Deyarli to'g'ri!"));
}

#[tokio::test]
async fn empty_answer_is_recorded_as_wrong() {
    let (app, store) = common::create_test_app().await;

    let (status, body) = common::post_json(
        app,
        "/api/v1/exercises/tr-apple/check-answer",
        Some("user-1"),
        json!({ "answer": "   " }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_correct"], json!(false));
    assert_eq!(body["score"], json!(0.0));
    assert_eq!(body["feedback"]["general"], json!("Javob kiritilmadi."));
    assert_eq!(store.attempt_count(), 1);
}

#[tokio::test]
async fn unknown_exercise_is_404() {
    let (app, _) = common::create_test_app().await;

    let (status, _) = common::post_json(
        app,
        "/api/v1/exercises/no-such-exercise/check-answer",
        Some("user-1"),
        json!({ "answer": "anything" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn inactive_exercise_is_404() {
    let (app, _) = common::create_test_app().await;

    let (status, _) = common::post_json(
        app,
        "/api/v1/exercises/retired-1/check-answer",
        Some("user-1"),
        json!({ "answer": "anor" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn speaking_without_a_speech_backend_is_503() {
    let (app, store) = common::create_test_app().await;

    let (status, _) = common::post_json(
        app,
        "/api/v1/exercises/speak-student/check-answer",
        Some("user-1"),
        json!({ "audio_url": "s3://audio/recording-1.ogg" }),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(store.attempt_count(), 0);
}

#[tokio::test]
async fn missing_user_header_is_400() {
    let (app, _) = common::create_test_app().await;

    let (status, _) = common::post_json(
        app,
        "/api/v1/exercises/mc-sum/check-answer",
        None,
        json!({ "answer": "B" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn skill_scores_follow_the_kind_mapping() {
    let (app, store) = common::create_test_app().await;

    let (status, _) = common::post_json(
        app.clone(),
        "/api/v1/exercises/tr-apple/check-answer",
        Some("user-9"),
        json!({ "answer": "men olma yeyman" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = common::post_json(
        app,
        "/api/v1/exercises/listen-school/check-answer",
        Some("user-9"),
        json!({ "answer": "men maktabga bordim" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let progress = store.progress_snapshot("user-9").unwrap();
    assert_eq!(progress.exercises_completed, 2);
    assert_eq!(progress.skill_scores.vocabulary, 100.0);
    assert_eq!(progress.skill_scores.grammar, 100.0);
    assert_eq!(progress.skill_scores.listening, 100.0);
    assert_eq!(progress.skill_scores.speaking, 0.0);
}

#[tokio::test]
async fn listing_exercises_hides_the_reference_answers() {
    let (app, _) = common::create_test_app().await;

    let (status, body) = common::get_json(app, "/api/v1/exercises?size=50", None).await;

    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    // The retired exercise stays hidden.
    assert_eq!(items.len(), 9);
    for item in items {
        assert!(item.get("correct_answer").is_none());
        assert!(item.get("explanation").is_none());
    }
}

#[tokio::test]
async fn progress_endpoint_reports_aggregates() {
    let (app, _) = common::create_test_app().await;

    // Fresh users get a zeroed progress row.
    let (status, body) = common::get_json(app.clone(), "/api/v1/progress", Some("user-3")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exercises_completed"], json!(0));

    let (status, _) = common::post_json(
        app.clone(),
        "/api/v1/exercises/mc-sum/check-answer",
        Some("user-3"),
        json!({ "answer": "B" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = common::get_json(app, "/api/v1/progress", Some("user-3")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exercises_completed"], json!(1));
}

#[tokio::test]
async fn attempt_history_is_newest_first_and_filterable() {
    let (app, _) = common::create_test_app().await;

    for answer in ["A", "B"] {
        let (status, _) = common::post_json(
            app.clone(),
            "/api/v1/exercises/mc-sum/check-answer",
            Some("user-4"),
            json!({ "answer": answer }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = common::post_json(
        app.clone(),
        "/api/v1/exercises/tf-plural/check-answer",
        Some("user-4"),
        json!({ "answer": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = common::get_json(app.clone(), "/api/v1/attempts", Some("user-4")).await;
    assert_eq!(status, StatusCode::OK);
    let attempts = body.as_array().unwrap();
    assert_eq!(attempts.len(), 3);
    assert_eq!(attempts[0]["exercise_id"], json!("tf-plural"));

    let (status, body) = common::get_json(
        app,
        "/api/v1/attempts?exercise_id=mc-sum",
        Some("user-4"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let attempts = body.as_array().unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0]["is_correct"], json!(true));
    assert_eq!(attempts[1]["is_correct"], json!(false));
}
