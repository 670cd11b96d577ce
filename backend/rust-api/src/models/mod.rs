use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod attempt;
pub mod feedback;
pub mod progress;
pub mod session;

pub use attempt::{Attempt, CheckAnswerRequest, CheckAnswerResponse};
pub use feedback::{Feedback, Verdict};
pub use progress::{SkillScores, UserProgress};
pub use session::{
    CreateTestSessionRequest, SubmitResponseRequest, TestResponse, TestSession, TestSessionStatus,
    TestSessionView,
};

/// Evaluator dispatch key. Stored as snake_case strings in MongoDB and on the
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    MultipleChoice,
    TrueFalse,
    FillInBlank,
    Matching,
    ShortAnswer,
    Essay,
    Listening,
    Speaking,
    Translation,
    Dictation,
}

impl ExerciseKind {
    /// Stable label for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseKind::MultipleChoice => "multiple_choice",
            ExerciseKind::TrueFalse => "true_false",
            ExerciseKind::FillInBlank => "fill_in_blank",
            ExerciseKind::Matching => "matching",
            ExerciseKind::ShortAnswer => "short_answer",
            ExerciseKind::Essay => "essay",
            ExerciseKind::Listening => "listening",
            ExerciseKind::Speaking => "speaking",
            ExerciseKind::Translation => "translation",
            ExerciseKind::Dictation => "dictation",
        }
    }
}

/// Tagged answer payload. Covers both the reference answer stored on an
/// exercise and the answer a user submits; the permitted shape depends on the
/// exercise kind and is validated at evaluator entry.
///
/// Untagged so the JSON column shapes stay what they always were:
/// `"B"`, `true`, `["salom", "assalom"]`, `{"1": "a", "2": "b"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Flag(bool),
    Number(i64),
    Text(String),
    Texts(Vec<String>),
    Pairs(BTreeMap<String, String>),
}

pub type UserAnswer = AnswerValue;
pub type CorrectAnswer = AnswerValue;

impl AnswerValue {
    /// Option key for choice exercises. Numeric keys are accepted and folded
    /// to their decimal string form.
    pub fn as_key(&self) -> Option<String> {
        match self {
            AnswerValue::Text(s) => Some(s.clone()),
            AnswerValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            AnswerValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Accepted-answer list: a plain string is a list of one.
    pub fn as_texts(&self) -> Option<Vec<&str>> {
        match self {
            AnswerValue::Text(s) => Some(vec![s.as_str()]),
            AnswerValue::Texts(list) => Some(list.iter().map(String::as_str).collect()),
            _ => None,
        }
    }

    pub fn as_pairs(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            AnswerValue::Pairs(pairs) => Some(pairs),
            _ => None,
        }
    }
}

/// An exercise definition. Shared, read-only during evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseDef {
    #[serde(rename = "_id")]
    pub id: String,
    pub kind: ExerciseKind,
    pub question: String,
    pub correct_answer: CorrectAnswer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ExerciseDef {
    /// Human-readable text of the correct option, for feedback on wrong
    /// multiple-choice answers. Falls back to the raw key when the options
    /// map does not resolve it.
    pub fn correct_option_text(&self) -> Option<String> {
        let key = self.correct_answer.as_key()?;
        match &self.options {
            Some(options) => Some(options.get(&key).cloned().unwrap_or(key)),
            None => Some(key),
        }
    }
}

/// Client-facing projection of an exercise. Never carries the reference
/// answer or the explanation.
#[derive(Debug, Clone, Serialize)]
pub struct ExerciseView {
    pub id: String,
    pub kind: ExerciseKind,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

impl From<ExerciseDef> for ExerciseView {
    fn from(def: ExerciseDef) -> Self {
        Self {
            id: def.id,
            kind: def.kind,
            question: def.question,
            options: def.options,
            tags: def.tags,
            audio_ref: def.audio_ref,
            difficulty: def.difficulty,
        }
    }
}

/// Ordered collection of exercises backing a test session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseSet {
    pub id: String,
    pub title: String,
    pub items: Vec<ExerciseSetItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseSetItem {
    pub exercise_id: String,
    pub order: u32,
    pub points: f64,
    pub required: bool,
}

impl ExerciseSet {
    /// Composes an ad-hoc set from a plain list of exercise ids, preserving
    /// the given order with one point per item.
    pub fn from_exercise_ids(title: impl Into<String>, exercise_ids: &[String]) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            items: exercise_ids
                .iter()
                .enumerate()
                .map(|(idx, exercise_id)| ExerciseSetItem {
                    exercise_id: exercise_id.clone(),
                    order: idx as u32,
                    points: 1.0,
                    required: true,
                })
                .collect(),
        }
    }
}
