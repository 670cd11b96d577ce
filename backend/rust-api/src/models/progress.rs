use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-skill aggregate scores in [0, 100]. Each slot only ever moves up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillScores {
    pub vocabulary: f64,
    pub grammar: f64,
    pub speaking: f64,
    pub listening: f64,
}

/// Aggregate progress, unique per user. The hot row: concurrent answer
/// checks for the same user serialize on it at the storage layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgress {
    #[serde(rename = "_id")]
    pub user_id: String,
    pub exercises_completed: u64,
    pub skill_scores: SkillScores,
    pub last_updated: DateTime<Utc>,
}

impl UserProgress {
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            exercises_completed: 0,
            skill_scores: SkillScores::default(),
            last_updated: now,
        }
    }
}
