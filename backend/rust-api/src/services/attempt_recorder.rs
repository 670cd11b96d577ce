//! Persists one attempt row plus the progress update, atomically. Called
//! only after the evaluator produced a verdict; invalid input and evaluator
//! failures never reach this point.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::CoreResult;
use crate::metrics::ATTEMPTS_RECORDED_TOTAL;
use crate::models::{Attempt, ExerciseDef, UserAnswer, Verdict};
use crate::repositories::{AttemptRepository, ProgressRepository};
use crate::services::progress_updater::ProgressUpdater;

pub struct AttemptRecorder {
    attempts: Arc<dyn AttemptRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl AttemptRecorder {
    pub fn new(
        attempts: Arc<dyn AttemptRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self { attempts, progress }
    }

    /// Exactly-once per call: the attempt row and the progress update commit
    /// together or not at all. Retrying is the API layer's choice.
    pub async fn record(
        &self,
        user_id: &str,
        exercise: &ExerciseDef,
        user_answer: Option<&UserAnswer>,
        verdict: &Verdict,
        time_spent_seconds: Option<u32>,
    ) -> CoreResult<Attempt> {
        let now = Utc::now();

        let mut progress = self.progress.get_or_create(user_id).await?;
        ProgressUpdater::apply(&mut progress, exercise, verdict, now);

        let attempt = Attempt {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            exercise_id: exercise.id.clone(),
            user_answer: user_answer.cloned(),
            is_correct: verdict.is_correct,
            score: verdict.score,
            feedback: verdict.feedback.clone(),
            time_spent_seconds,
            created_at: now,
        };

        self.attempts
            .create_with_progress(&attempt, &progress)
            .await?;

        ATTEMPTS_RECORDED_TOTAL.inc();
        tracing::info!(
            "Attempt recorded: user={}, exercise={}, correct={}, score={:.3}",
            user_id,
            exercise.id,
            verdict.is_correct,
            verdict.score
        );

        Ok(attempt)
    }
}
