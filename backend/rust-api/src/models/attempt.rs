use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{AnswerValue, Feedback};

/// One recorded answer attempt. Append-only; written together with the
/// progress update in a single transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub exercise_id: String,
    pub user_answer: Option<AnswerValue>,
    pub is_correct: bool,
    pub score: f64,
    pub feedback: Feedback,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent_seconds: Option<u32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckAnswerRequest {
    /// Absent for pure audio submissions (speaking, audio dictation).
    pub answer: Option<AnswerValue>,
    #[validate(length(max = 1024, message = "audio_url is too long"))]
    pub audio_url: Option<String>,
    /// BCP-47-ish locale code; falls back to the configured default.
    #[validate(length(min = 2, max = 16, message = "language must be a locale code"))]
    pub language: Option<String>,
    pub time_spent_seconds: Option<u32>,
    #[validate(length(max = 128, message = "idempotency_key is too long"))]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckAnswerResponse {
    pub is_correct: bool,
    pub score: f64,
    pub feedback: Feedback,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}
