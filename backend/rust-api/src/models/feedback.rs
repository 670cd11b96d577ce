use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structured feedback attached to every verdict. `general` is a short canned
/// message, `specific` carries per-item detail (e.g. per-pair verdicts for
/// matching exercises), `audio_feedback` holds pronunciation detail for
/// speaking exercises.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub general: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub specific: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_feedback: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Feedback {
    /// Minimal record used when feedback assembly itself is impossible.
    pub fn unavailable() -> Self {
        Feedback {
            general: "unavailable".to_string(),
            ..Feedback::default()
        }
    }
}

/// The evaluator's result for one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_correct: bool,
    pub score: f64,
    pub feedback: Feedback,
}

impl Verdict {
    pub fn new(is_correct: bool, score: f64, feedback: Feedback) -> Self {
        Self {
            is_correct,
            score: score.clamp(0.0, 1.0),
            feedback,
        }
    }
}
