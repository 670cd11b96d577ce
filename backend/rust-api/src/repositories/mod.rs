//! Narrow read/write interfaces over the storage layer. The evaluation core
//! only ever talks to these traits; MongoDB and in-memory implementations
//! live in the submodules.

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::CoreResult;
use crate::models::{Attempt, ExerciseDef, ExerciseKind, TestResponse, TestSession, UserProgress};

pub mod memory;
pub mod mongo;

#[derive(Debug, Clone, Default)]
pub struct ExerciseFilter {
    pub kind: Option<ExerciseKind>,
    /// Listing endpoints only ever show active exercises; admin tooling may
    /// clear this.
    pub active_only: bool,
}

#[async_trait]
pub trait ExerciseRepository: Send + Sync {
    async fn get(&self, id: &str) -> CoreResult<Option<ExerciseDef>>;
    async fn list(&self, filter: &ExerciseFilter, page: u64, size: u64)
        -> CoreResult<Vec<ExerciseDef>>;
}

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Persists the attempt and the updated progress row atomically: after a
    /// failure neither write is visible.
    async fn create_with_progress(
        &self,
        attempt: &Attempt,
        progress: &UserProgress,
    ) -> CoreResult<()>;

    async fn list(
        &self,
        user_id: &str,
        exercise_id: Option<&str>,
        page: u64,
        size: u64,
    ) -> CoreResult<Vec<Attempt>>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn get(&self, user_id: &str) -> CoreResult<Option<UserProgress>>;
    async fn get_or_create(&self, user_id: &str) -> CoreResult<UserProgress>;
    async fn update(&self, progress: &UserProgress) -> CoreResult<()>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create_with_responses(
        &self,
        session: &TestSession,
        responses: &[TestResponse],
    ) -> CoreResult<()>;

    async fn get(&self, id: &str) -> CoreResult<Option<TestSession>>;

    /// Responses of a session in ascending id order (the grading order).
    async fn list_responses(&self, session_id: &str) -> CoreResult<Vec<TestResponse>>;

    async fn upsert_response(&self, response: &TestResponse) -> CoreResult<()>;

    /// Writes the terminal session state and any graded responses in one
    /// transaction.
    async fn finish_with_responses(
        &self,
        session: &TestSession,
        responses: &[TestResponse],
    ) -> CoreResult<()>;
}

/// The storage handles an `AppState` carries around.
#[derive(Clone)]
pub struct Repositories {
    pub exercises: Arc<dyn ExerciseRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}
