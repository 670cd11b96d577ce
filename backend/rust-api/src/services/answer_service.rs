//! The `check_answer` orchestration: idempotency cache, exercise lookup,
//! evaluation, attempt + progress persistence.

use redis::aio::ConnectionManager;

use crate::errors::{CoreError, CoreResult};
use crate::metrics::{record_answer_checked, record_cache_hit, record_cache_miss, track_cache_operation};
use crate::models::{CheckAnswerRequest, CheckAnswerResponse, ExerciseDef};
use crate::repositories::Repositories;
use crate::services::attempt_recorder::AttemptRecorder;
use crate::services::evaluator::AnswerEvaluator;
use crate::services::AppState;
use crate::utils::retry::{retry_with_backoff, RetryConfig};

const EXERCISE_CACHE_TTL_SECONDS: u64 = 300;
const IDEMPOTENCY_TTL_SECONDS: u64 = 86_400; // 24 hours

pub struct AnswerService {
    repos: Repositories,
    evaluator: AnswerEvaluator,
    redis: Option<ConnectionManager>,
    default_locale: String,
}

impl AnswerService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repos: state.repos.clone(),
            evaluator: state.evaluator.clone(),
            redis: state.redis.clone(),
            default_locale: state.config.default_locale.clone(),
        }
    }

    pub async fn check_answer(
        &self,
        exercise_id: &str,
        user_id: &str,
        req: &CheckAnswerRequest,
    ) -> CoreResult<CheckAnswerResponse> {
        tracing::info!(
            "Checking answer: user={}, exercise={}",
            user_id,
            exercise_id
        );

        let locale = req
            .language
            .clone()
            .unwrap_or_else(|| self.default_locale.clone());

        // Idempotent replay: same key returns the cached verdict without a
        // second attempt row.
        let idempotency_key = req
            .idempotency_key
            .as_ref()
            .map(|key| format!("{}:{}:{}", user_id, exercise_id, key));
        if let Some(key) = &idempotency_key {
            if let Some(cached) = self.cached_response(key).await {
                record_cache_hit();
                tracing::info!("Returning cached verdict for idempotency key {}", key);
                return Ok(cached);
            }
            record_cache_miss();
        }

        let exercise = self.load_exercise(exercise_id).await?;

        let verdict = self
            .evaluator
            .evaluate(
                &exercise,
                req.answer.as_ref(),
                req.audio_url.as_deref(),
                &locale,
            )
            .await?;
        record_answer_checked(exercise.kind.as_str(), verdict.is_correct);

        let recorder =
            AttemptRecorder::new(self.repos.attempts.clone(), self.repos.progress.clone());
        recorder
            .record(
                user_id,
                &exercise,
                req.answer.as_ref(),
                &verdict,
                req.time_spent_seconds,
            )
            .await?;

        let response = CheckAnswerResponse {
            is_correct: verdict.is_correct,
            score: verdict.score,
            feedback: verdict.feedback,
            explanation: exercise.explanation.clone(),
        };

        if let Some(key) = &idempotency_key {
            self.cache_response(key, &response).await;
        }

        Ok(response)
    }

    /// Read-through cache over the exercise repository. Inactive exercises
    /// are treated as missing and never cached.
    async fn load_exercise(&self, exercise_id: &str) -> CoreResult<ExerciseDef> {
        if let Some(cached) = self.cached_exercise(exercise_id).await {
            record_cache_hit();
            return Ok(cached);
        }

        let exercise = self
            .repos
            .exercises
            .get(exercise_id)
            .await?
            .filter(|def| def.active)
            .ok_or(CoreError::ExerciseNotFound)?;

        if self.redis.is_some() {
            record_cache_miss();
        }
        self.cache_exercise(&exercise).await;
        Ok(exercise)
    }

    async fn cached_exercise(&self, exercise_id: &str) -> Option<ExerciseDef> {
        let conn = self.redis.clone()?;
        let cache_key = format!("exercise:{}", exercise_id);

        let cached: Option<String> = track_cache_operation("get", async {
            retry_with_backoff(RetryConfig::default(), || async {
                let mut conn = conn.clone();
                redis::cmd("GET")
                    .arg(&cache_key)
                    .query_async::<Option<String>>(&mut conn)
                    .await
            })
            .await
            .map_err(anyhow::Error::new)
        })
        .await
        .map_err(|e| tracing::warn!("Exercise cache read failed: {}", e))
        .ok()?;

        cached.and_then(|json| serde_json::from_str(&json).ok())
    }

    async fn cache_exercise(&self, exercise: &ExerciseDef) {
        let Some(mut conn) = self.redis.clone() else {
            return;
        };
        let cache_key = format!("exercise:{}", exercise.id);
        let Ok(json) = serde_json::to_string(exercise) else {
            return;
        };

        let result = track_cache_operation("setex", async {
            redis::cmd("SETEX")
                .arg(&cache_key)
                .arg(EXERCISE_CACHE_TTL_SECONDS)
                .arg(&json)
                .query_async::<()>(&mut conn)
                .await
                .map_err(anyhow::Error::new)
        })
        .await;

        if let Err(e) = result {
            tracing::warn!("Exercise cache write failed: {}", e);
        }
    }

    async fn cached_response(&self, idempotency_key: &str) -> Option<CheckAnswerResponse> {
        let conn = self.redis.clone()?;
        let cache_key = format!("idempotency:answer:{}", idempotency_key);

        let cached: Option<String> = track_cache_operation("get", async {
            retry_with_backoff(RetryConfig::default(), || async {
                let mut conn = conn.clone();
                redis::cmd("GET")
                    .arg(&cache_key)
                    .query_async::<Option<String>>(&mut conn)
                    .await
            })
            .await
            .map_err(anyhow::Error::new)
        })
        .await
        .map_err(|e| tracing::warn!("Idempotency cache read failed: {}", e))
        .ok()?;

        cached.and_then(|json| serde_json::from_str(&json).ok())
    }

    async fn cache_response(&self, idempotency_key: &str, response: &CheckAnswerResponse) {
        let Some(mut conn) = self.redis.clone() else {
            return;
        };
        let cache_key = format!("idempotency:answer:{}", idempotency_key);
        let Ok(json) = serde_json::to_string(response) else {
            return;
        };

        let result = track_cache_operation("setex", async {
            redis::cmd("SETEX")
                .arg(&cache_key)
                .arg(IDEMPOTENCY_TTL_SECONDS)
                .arg(&json)
                .query_async::<()>(&mut conn)
                .await
                .map_err(anyhow::Error::new)
        })
        .await;

        if let Err(e) = result {
            tracing::warn!("Idempotency cache write failed: {}", e);
        }
    }
}
