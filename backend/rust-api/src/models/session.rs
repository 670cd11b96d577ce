use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{AnswerValue, Feedback};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestSessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl TestSessionStatus {
    /// Terminal sessions accept no further mutations.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TestSessionStatus::Completed | TestSessionStatus::Abandoned
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSession {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub status: TestSessionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_seconds: Option<u32>,
}

/// One slot of a test session, created when the session composes its
/// exercise set. `user_answer` is mutable until the session terminates;
/// the graded fields are written exactly once, during grading.
///
/// Response ids are prefixed with the zero-padded set order so that the
/// ascending-id grading order follows the set order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub session_id: String,
    pub exercise_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<AnswerValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent_seconds: Option<u32>,
}

impl TestResponse {
    pub fn pending(session_id: &str, exercise_id: &str, order: u32) -> Self {
        Self {
            id: format!("{:04}-{}", order, uuid::Uuid::new_v4()),
            session_id: session_id.to_string(),
            exercise_id: exercise_id.to_string(),
            user_answer: None,
            is_correct: None,
            score: None,
            feedback: None,
            time_spent_seconds: None,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTestSessionRequest {
    #[validate(length(min = 1, max = 64, message = "kind must be a short label"))]
    pub kind: Option<String>,
    #[validate(length(min = 1, max = 200, message = "a session needs at least one exercise"))]
    pub exercise_ids: Vec<String>,
    pub time_limit_seconds: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitResponseRequest {
    #[validate(length(min = 1, message = "exercise_id is required"))]
    pub exercise_id: String,
    pub answer: Option<AnswerValue>,
    pub time_spent_seconds: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct TestSessionView {
    #[serde(flatten)]
    pub session: TestSession,
    pub responses: Vec<TestResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!TestSessionStatus::InProgress.is_terminal());
        assert!(TestSessionStatus::Completed.is_terminal());
        assert!(TestSessionStatus::Abandoned.is_terminal());
    }

    #[test]
    fn pending_response_ids_sort_in_set_order() {
        let mut ids: Vec<String> = (0..12)
            .rev()
            .map(|order| TestResponse::pending("s-1", "ex", order).id)
            .collect();
        ids.sort();
        for (idx, id) in ids.iter().enumerate() {
            assert!(id.starts_with(&format!("{:04}-", idx)));
        }
    }
}
