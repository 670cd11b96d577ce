//! Test-session lifecycle: composing a session from an exercise set,
//! collecting responses, and the composite grading pass that reuses the
//! answer evaluator over every response.

use chrono::Utc;
use uuid::Uuid;

use crate::errors::{CoreError, CoreResult};
use crate::metrics::{TEST_SESSIONS_ACTIVE, TEST_SESSIONS_TOTAL};
use crate::models::{
    CreateTestSessionRequest, ExerciseSet, SubmitResponseRequest, TestResponse, TestSession,
    TestSessionStatus, TestSessionView, Verdict,
};
use crate::repositories::Repositories;
use crate::services::evaluator::AnswerEvaluator;
use crate::services::feedback::{FeedbackBuilder, VerdictClass};
use crate::services::AppState;

pub struct TestSessionService {
    repos: Repositories,
    evaluator: AnswerEvaluator,
    default_locale: String,
}

impl TestSessionService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repos: state.repos.clone(),
            evaluator: state.evaluator.clone(),
            default_locale: state.config.default_locale.clone(),
        }
    }

    pub async fn create_session(
        &self,
        user_id: &str,
        req: &CreateTestSessionRequest,
    ) -> CoreResult<TestSessionView> {
        let kind = req.kind.clone().unwrap_or_else(|| "practice".to_string());
        let set = ExerciseSet::from_exercise_ids(kind.clone(), &req.exercise_ids);

        // Every referenced exercise must exist and be active before the
        // session is opened.
        for item in &set.items {
            self.repos
                .exercises
                .get(&item.exercise_id)
                .await?
                .filter(|def| def.active)
                .ok_or(CoreError::ExerciseNotFound)?;
        }

        let session = TestSession {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind,
            status: TestSessionStatus::InProgress,
            started_at: Utc::now(),
            ended_at: None,
            total_score: None,
            time_limit_seconds: req.time_limit_seconds,
        };

        let responses: Vec<TestResponse> = set
            .items
            .iter()
            .map(|item| TestResponse::pending(&session.id, &item.exercise_id, item.order))
            .collect();

        self.repos
            .sessions
            .create_with_responses(&session, &responses)
            .await?;

        TEST_SESSIONS_TOTAL.with_label_values(&["created"]).inc();
        TEST_SESSIONS_ACTIVE.inc();
        tracing::info!(
            "Test session created: {} for user {} with {} exercises",
            session.id,
            user_id,
            responses.len()
        );

        Ok(TestSessionView { session, responses })
    }

    pub async fn get_session(&self, session_id: &str, user_id: &str) -> CoreResult<TestSessionView> {
        let session = self.load_owned_session(session_id, user_id).await?;
        let responses = self.repos.sessions.list_responses(session_id).await?;
        Ok(TestSessionView { session, responses })
    }

    /// Upserts the user's answer for one exercise of an in-progress session.
    pub async fn submit_response(
        &self,
        session_id: &str,
        user_id: &str,
        req: &SubmitResponseRequest,
    ) -> CoreResult<TestResponse> {
        let session = self.load_owned_session(session_id, user_id).await?;
        if session.status.is_terminal() {
            return Err(CoreError::SessionTerminal);
        }
        if self.expire_if_overdue(&session).await? {
            return Err(CoreError::SessionTerminal);
        }

        let responses = self.repos.sessions.list_responses(session_id).await?;
        let mut response = responses
            .into_iter()
            .find(|r| r.exercise_id == req.exercise_id)
            .ok_or_else(|| {
                CoreError::invalid_input("Exercise is not part of this test session")
            })?;

        response.user_answer = req.answer.clone();
        response.time_spent_seconds = req.time_spent_seconds;
        self.repos.sessions.upsert_response(&response).await?;

        tracing::info!(
            "Response submitted: session={}, exercise={}",
            session_id,
            req.exercise_id
        );
        Ok(response)
    }

    /// Grades every response in ascending id order and transitions the
    /// session to `Completed`. A second call on a terminal session is a
    /// no-op returning the stored state.
    pub async fn grade(&self, session_id: &str, user_id: &str) -> CoreResult<TestSession> {
        let mut session = self.load_owned_session(session_id, user_id).await?;
        if session.status.is_terminal() {
            tracing::info!("Session {} already terminal, grading skipped", session_id);
            return Ok(session);
        }

        let mut responses = self.repos.sessions.list_responses(session_id).await?;
        let mut score_sum = 0.0;

        for response in &mut responses {
            let verdict = self.grade_response(response).await;
            response.is_correct = Some(verdict.is_correct);
            response.score = Some(verdict.score);
            score_sum += verdict.score;
            response.feedback = Some(verdict.feedback);
        }

        let total_score = if responses.is_empty() {
            0.0
        } else {
            round2(score_sum / responses.len() as f64 * 100.0)
        };

        session.status = TestSessionStatus::Completed;
        session.ended_at = Some(Utc::now());
        session.total_score = Some(total_score);

        self.repos
            .sessions
            .finish_with_responses(&session, &responses)
            .await?;

        TEST_SESSIONS_TOTAL.with_label_values(&["completed"]).inc();
        TEST_SESSIONS_ACTIVE.dec();
        tracing::info!(
            "Test session graded: {} total_score={:.2}",
            session_id,
            total_score
        );

        Ok(session)
    }

    /// Explicit `InProgress → Abandoned` transition (client timeout or
    /// navigation away). Responses keep whatever answers they hold.
    pub async fn abandon(&self, session_id: &str, user_id: &str) -> CoreResult<TestSession> {
        let mut session = self.load_owned_session(session_id, user_id).await?;
        if session.status.is_terminal() {
            return Err(CoreError::SessionTerminal);
        }

        session.status = TestSessionStatus::Abandoned;
        session.ended_at = Some(Utc::now());
        self.repos
            .sessions
            .finish_with_responses(&session, &[])
            .await?;

        TEST_SESSIONS_TOTAL.with_label_values(&["abandoned"]).inc();
        TEST_SESSIONS_ACTIVE.dec();
        tracing::info!("Test session abandoned: {}", session_id);

        Ok(session)
    }

    /// One response's grade. Per-response failures never abort the session:
    /// they grade as wrong with a failure feedback record.
    async fn grade_response(&self, response: &TestResponse) -> Verdict {
        let Some(answer) = &response.user_answer else {
            let feedback = FeedbackBuilder::new(&self.default_locale)
                .class(VerdictClass::Empty)
                .build();
            return Verdict::new(false, 0.0, feedback);
        };

        let exercise = match self.repos.exercises.get(&response.exercise_id).await {
            Ok(Some(def)) => def,
            Ok(None) => {
                tracing::warn!(
                    "Exercise {} of response {} disappeared before grading",
                    response.exercise_id,
                    response.id
                );
                return Verdict::new(false, 0.0, FeedbackBuilder::evaluation_failed());
            }
            Err(e) => {
                tracing::warn!("Failed to load exercise for response {}: {}", response.id, e);
                return Verdict::new(false, 0.0, FeedbackBuilder::evaluation_failed());
            }
        };

        match self
            .evaluator
            .evaluate(&exercise, Some(answer), None, &self.default_locale)
            .await
        {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!("Grading response {} failed: {}", response.id, e);
                Verdict::new(false, 0.0, FeedbackBuilder::evaluation_failed())
            }
        }
    }

    /// Sessions past their time limit flip to `Abandoned` on the next
    /// submission instead of silently accepting late answers.
    async fn expire_if_overdue(&self, session: &TestSession) -> CoreResult<bool> {
        let Some(limit) = session.time_limit_seconds else {
            return Ok(false);
        };
        let deadline = session.started_at + chrono::Duration::seconds(i64::from(limit));
        if Utc::now() <= deadline {
            return Ok(false);
        }

        let mut expired = session.clone();
        expired.status = TestSessionStatus::Abandoned;
        expired.ended_at = Some(Utc::now());
        self.repos
            .sessions
            .finish_with_responses(&expired, &[])
            .await?;

        TEST_SESSIONS_TOTAL.with_label_values(&["abandoned"]).inc();
        TEST_SESSIONS_ACTIVE.dec();
        tracing::warn!("Test session {} expired, marking abandoned", session.id);
        Ok(true)
    }

    async fn load_owned_session(&self, session_id: &str, user_id: &str) -> CoreResult<TestSession> {
        let session = self
            .repos
            .sessions
            .get(session_id)
            .await?
            .ok_or(CoreError::SessionNotFound)?;
        if session.user_id != user_id {
            return Err(CoreError::SessionForbidden);
        }
        Ok(session)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::round2;

    #[test]
    fn total_scores_round_to_two_decimals() {
        assert_eq!(round2(2.0 / 3.0 * 100.0), 66.67);
        assert_eq!(round2(100.0), 100.0);
        assert_eq!(round2(0.0), 0.0);
    }
}
