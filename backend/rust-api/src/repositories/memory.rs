//! Mutex-guarded in-memory storage. Backs the integration test suite and
//! local development without a MongoDB; a single lock per store gives the
//! same both-or-neither visibility the MongoDB transactions provide.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::CoreResult;
use crate::models::{Attempt, ExerciseDef, TestResponse, TestSession, UserProgress};

use super::{
    AttemptRepository, ExerciseFilter, ExerciseRepository, ProgressRepository, Repositories,
    SessionRepository,
};

#[derive(Default)]
struct MemoryInner {
    exercises: BTreeMap<String, ExerciseDef>,
    attempts: Vec<Attempt>,
    progress: BTreeMap<String, UserProgress>,
    sessions: BTreeMap<String, TestSession>,
    responses: BTreeMap<String, TestResponse>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().expect("memory store lock poisoned")
    }

    pub fn seed_exercise(&self, def: ExerciseDef) {
        self.lock().exercises.insert(def.id.clone(), def);
    }

    /// All four repository handles backed by this store.
    pub fn repositories(&self) -> Repositories {
        Repositories {
            exercises: Arc::new(self.clone()),
            attempts: Arc::new(self.clone()),
            progress: Arc::new(self.clone()),
            sessions: Arc::new(self.clone()),
        }
    }

    // Inspection helpers for tests.

    pub fn attempt_count(&self) -> usize {
        self.lock().attempts.len()
    }

    pub fn last_attempt(&self) -> Option<Attempt> {
        self.lock().attempts.last().cloned()
    }

    pub fn progress_snapshot(&self, user_id: &str) -> Option<UserProgress> {
        self.lock().progress.get(user_id).cloned()
    }
}

#[async_trait]
impl ExerciseRepository for MemoryStore {
    async fn get(&self, id: &str) -> CoreResult<Option<ExerciseDef>> {
        Ok(self.lock().exercises.get(id).cloned())
    }

    async fn list(
        &self,
        filter: &ExerciseFilter,
        page: u64,
        size: u64,
    ) -> CoreResult<Vec<ExerciseDef>> {
        let inner = self.lock();
        let matching = inner
            .exercises
            .values()
            .filter(|def| !filter.active_only || def.active)
            .filter(|def| filter.kind.map(|kind| def.kind == kind).unwrap_or(true))
            .skip((page.saturating_mul(size)) as usize)
            .take(size as usize)
            .cloned()
            .collect();
        Ok(matching)
    }
}

#[async_trait]
impl AttemptRepository for MemoryStore {
    async fn create_with_progress(
        &self,
        attempt: &Attempt,
        progress: &UserProgress,
    ) -> CoreResult<()> {
        let mut inner = self.lock();
        inner.attempts.push(attempt.clone());
        inner
            .progress
            .insert(progress.user_id.clone(), progress.clone());
        Ok(())
    }

    async fn list(
        &self,
        user_id: &str,
        exercise_id: Option<&str>,
        page: u64,
        size: u64,
    ) -> CoreResult<Vec<Attempt>> {
        // Newest first, like the MongoDB implementation.
        let inner = self.lock();
        let matching = inner
            .attempts
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .filter(|a| exercise_id.map(|ex| a.exercise_id == ex).unwrap_or(true))
            .skip((page.saturating_mul(size)) as usize)
            .take(size as usize)
            .cloned()
            .collect();
        Ok(matching)
    }
}

#[async_trait]
impl ProgressRepository for MemoryStore {
    async fn get(&self, user_id: &str) -> CoreResult<Option<UserProgress>> {
        Ok(self.lock().progress.get(user_id).cloned())
    }

    async fn get_or_create(&self, user_id: &str) -> CoreResult<UserProgress> {
        let mut inner = self.lock();
        let progress = inner
            .progress
            .entry(user_id.to_string())
            .or_insert_with(|| UserProgress::new(user_id, chrono::Utc::now()));
        Ok(progress.clone())
    }

    async fn update(&self, progress: &UserProgress) -> CoreResult<()> {
        self.lock()
            .progress
            .insert(progress.user_id.clone(), progress.clone());
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn create_with_responses(
        &self,
        session: &TestSession,
        responses: &[TestResponse],
    ) -> CoreResult<()> {
        let mut inner = self.lock();
        inner.sessions.insert(session.id.clone(), session.clone());
        for response in responses {
            inner.responses.insert(response.id.clone(), response.clone());
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> CoreResult<Option<TestSession>> {
        Ok(self.lock().sessions.get(id).cloned())
    }

    async fn list_responses(&self, session_id: &str) -> CoreResult<Vec<TestResponse>> {
        // BTreeMap iteration is id-ascending already.
        let inner = self.lock();
        Ok(inner
            .responses
            .values()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn upsert_response(&self, response: &TestResponse) -> CoreResult<()> {
        self.lock()
            .responses
            .insert(response.id.clone(), response.clone());
        Ok(())
    }

    async fn finish_with_responses(
        &self,
        session: &TestSession,
        responses: &[TestResponse],
    ) -> CoreResult<()> {
        let mut inner = self.lock();
        inner.sessions.insert(session.id.clone(), session.clone());
        for response in responses {
            inner.responses.insert(response.id.clone(), response.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerValue, ExerciseKind, Feedback};
    use chrono::Utc;

    fn sample_exercise(id: &str, active: bool) -> ExerciseDef {
        ExerciseDef {
            id: id.to_string(),
            kind: ExerciseKind::ShortAnswer,
            question: "Tarjima qiling: apple".to_string(),
            correct_answer: AnswerValue::Text("olma".to_string()),
            options: None,
            explanation: None,
            tags: vec![],
            audio_ref: None,
            difficulty: None,
            active,
        }
    }

    #[tokio::test]
    async fn list_respects_active_filter_and_paging() {
        let store = MemoryStore::new();
        store.seed_exercise(sample_exercise("a", true));
        store.seed_exercise(sample_exercise("b", false));
        store.seed_exercise(sample_exercise("c", true));

        let filter = ExerciseFilter {
            kind: None,
            active_only: true,
        };
        let all = ExerciseRepository::list(&store, &filter, 0, 10).await.unwrap();
        assert_eq!(all.len(), 2);

        let second_page = ExerciseRepository::list(&store, &filter, 1, 1).await.unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].id, "c");
    }

    #[tokio::test]
    async fn attempt_write_updates_progress_in_the_same_step() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut progress = UserProgress::new("u-1", now);
        progress.exercises_completed = 1;

        let attempt = Attempt {
            id: "at-1".to_string(),
            user_id: "u-1".to_string(),
            exercise_id: "a".to_string(),
            user_answer: Some(AnswerValue::Text("olma".to_string())),
            is_correct: true,
            score: 1.0,
            feedback: Feedback::default(),
            time_spent_seconds: None,
            created_at: now,
        };

        store.create_with_progress(&attempt, &progress).await.unwrap();
        assert_eq!(store.attempt_count(), 1);
        assert_eq!(
            store.progress_snapshot("u-1").unwrap().exercises_completed,
            1
        );
    }

    #[tokio::test]
    async fn progress_rows_are_created_once_and_updatable() {
        let store = MemoryStore::new();

        let fresh = store.get_or_create("u-7").await.unwrap();
        assert_eq!(fresh.exercises_completed, 0);

        let mut updated = fresh.clone();
        updated.exercises_completed = 3;
        updated.skill_scores.listening = 90.0;
        store.update(&updated).await.unwrap();

        let reloaded = ProgressRepository::get(&store, "u-7").await.unwrap().unwrap();
        assert_eq!(reloaded.exercises_completed, 3);
        assert_eq!(reloaded.skill_scores.listening, 90.0);

        // get_or_create never resets an existing row.
        let again = store.get_or_create("u-7").await.unwrap();
        assert_eq!(again.exercises_completed, 3);
    }

    #[tokio::test]
    async fn responses_come_back_in_id_order() {
        let store = MemoryStore::new();
        let session = TestSession {
            id: "s-1".to_string(),
            user_id: "u-1".to_string(),
            kind: "practice".to_string(),
            status: crate::models::TestSessionStatus::InProgress,
            started_at: Utc::now(),
            ended_at: None,
            total_score: None,
            time_limit_seconds: None,
        };
        let responses: Vec<TestResponse> = (0..3)
            .rev()
            .map(|order| TestResponse::pending("s-1", &format!("ex-{order}"), order))
            .collect();

        store
            .create_with_responses(&session, &responses)
            .await
            .unwrap();

        let listed = store.list_responses("s-1").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(listed[0].exercise_id, "ex-0");
    }
}
