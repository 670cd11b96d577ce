//! MongoDB-backed repositories. Multi-document writes (attempt + progress,
//! session grading) run inside a `ClientSession` transaction so partial
//! results are never visible.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::ReplaceOptions;
use mongodb::{Client, Collection, Database};

use crate::errors::{CoreError, CoreResult};
use crate::models::{Attempt, ExerciseDef, TestResponse, TestSession, UserProgress};
use crate::utils::retry::{retry_with_backoff, RetryConfig};

use super::{
    AttemptRepository, ExerciseFilter, ExerciseRepository, ProgressRepository, Repositories,
    SessionRepository,
};

const EXERCISES: &str = "exercises";
const ATTEMPTS: &str = "exercise_attempts";
const PROGRESS: &str = "user_progress";
const SESSIONS: &str = "test_sessions";
const RESPONSES: &str = "test_responses";

fn storage_err(context: &'static str, e: mongodb::error::Error) -> CoreError {
    CoreError::Storage(anyhow::Error::new(e).context(context))
}

/// Builds the full repository bundle over one database handle.
pub fn build_repositories(client: &Client, db: &Database) -> Repositories {
    Repositories {
        exercises: std::sync::Arc::new(MongoExerciseRepository {
            exercises: db.collection(EXERCISES),
        }),
        attempts: std::sync::Arc::new(MongoAttemptRepository {
            client: client.clone(),
            attempts: db.collection(ATTEMPTS),
            progress: db.collection(PROGRESS),
        }),
        progress: std::sync::Arc::new(MongoProgressRepository {
            progress: db.collection(PROGRESS),
        }),
        sessions: std::sync::Arc::new(MongoSessionRepository {
            client: client.clone(),
            sessions: db.collection(SESSIONS),
            responses: db.collection(RESPONSES),
        }),
    }
}

pub struct MongoExerciseRepository {
    exercises: Collection<ExerciseDef>,
}

#[async_trait]
impl ExerciseRepository for MongoExerciseRepository {
    async fn get(&self, id: &str) -> CoreResult<Option<ExerciseDef>> {
        retry_with_backoff(RetryConfig::storage(), || async {
            self.exercises.find_one(doc! { "_id": id }).await
        })
        .await
        .map_err(|e| storage_err("Failed to load exercise", e))
    }

    async fn list(
        &self,
        filter: &ExerciseFilter,
        page: u64,
        size: u64,
    ) -> CoreResult<Vec<ExerciseDef>> {
        let mut query = doc! {};
        if filter.active_only {
            query.insert("active", true);
        }
        if let Some(kind) = filter.kind {
            query.insert("kind", kind.as_str());
        }

        let cursor = self
            .exercises
            .find(query)
            .sort(doc! { "_id": 1 })
            .skip(page.saturating_mul(size))
            .limit(size as i64)
            .await
            .map_err(|e| storage_err("Failed to query exercises", e))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| storage_err("Failed to stream exercises", e))
    }
}

pub struct MongoAttemptRepository {
    client: Client,
    attempts: Collection<Attempt>,
    progress: Collection<UserProgress>,
}

#[async_trait]
impl AttemptRepository for MongoAttemptRepository {
    async fn create_with_progress(
        &self,
        attempt: &Attempt,
        progress: &UserProgress,
    ) -> CoreResult<()> {
        let mut session = self
            .client
            .start_session()
            .await
            .map_err(|e| storage_err("Failed to start storage session", e))?;
        session
            .start_transaction()
            .await
            .map_err(|e| storage_err("Failed to start attempt transaction", e))?;

        let writes: Result<(), mongodb::error::Error> = async {
            self.attempts
                .insert_one(attempt)
                .session(&mut session)
                .await?;
            self.progress
                .replace_one(doc! { "_id": &progress.user_id }, progress)
                .with_options(ReplaceOptions::builder().upsert(true).build())
                .session(&mut session)
                .await?;
            Ok(())
        }
        .await;

        match writes {
            Ok(()) => session
                .commit_transaction()
                .await
                .map_err(|e| storage_err("Failed to commit attempt transaction", e)),
            Err(e) => {
                let _ = session.abort_transaction().await;
                Err(storage_err("Attempt transaction aborted", e))
            }
        }
    }

    async fn list(
        &self,
        user_id: &str,
        exercise_id: Option<&str>,
        page: u64,
        size: u64,
    ) -> CoreResult<Vec<Attempt>> {
        let mut query = doc! { "user_id": user_id };
        if let Some(exercise_id) = exercise_id {
            query.insert("exercise_id", exercise_id);
        }

        let cursor = self
            .attempts
            .find(query)
            .sort(doc! { "created_at": -1 })
            .skip(page.saturating_mul(size))
            .limit(size as i64)
            .await
            .map_err(|e| storage_err("Failed to query attempts", e))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| storage_err("Failed to stream attempts", e))
    }
}

pub struct MongoProgressRepository {
    progress: Collection<UserProgress>,
}

#[async_trait]
impl ProgressRepository for MongoProgressRepository {
    async fn get(&self, user_id: &str) -> CoreResult<Option<UserProgress>> {
        retry_with_backoff(RetryConfig::storage(), || async {
            self.progress.find_one(doc! { "_id": user_id }).await
        })
        .await
        .map_err(|e| storage_err("Failed to load progress", e))
    }

    async fn get_or_create(&self, user_id: &str) -> CoreResult<UserProgress> {
        if let Some(existing) = self.get(user_id).await? {
            return Ok(existing);
        }

        let fresh = UserProgress::new(user_id, chrono::Utc::now());
        match self.progress.insert_one(&fresh).await {
            Ok(_) => Ok(fresh),
            // Lost the creation race: another request inserted the row first.
            Err(_) => self
                .get(user_id)
                .await?
                .ok_or_else(|| CoreError::Storage(anyhow::anyhow!("Progress row vanished for {user_id}"))),
        }
    }

    async fn update(&self, progress: &UserProgress) -> CoreResult<()> {
        self.progress
            .replace_one(doc! { "_id": &progress.user_id }, progress)
            .with_options(ReplaceOptions::builder().upsert(true).build())
            .await
            .map_err(|e| storage_err("Failed to update progress", e))?;
        Ok(())
    }
}

pub struct MongoSessionRepository {
    client: Client,
    sessions: Collection<TestSession>,
    responses: Collection<TestResponse>,
}

#[async_trait]
impl SessionRepository for MongoSessionRepository {
    async fn create_with_responses(
        &self,
        session_doc: &TestSession,
        responses: &[TestResponse],
    ) -> CoreResult<()> {
        let mut session = self
            .client
            .start_session()
            .await
            .map_err(|e| storage_err("Failed to start storage session", e))?;
        session
            .start_transaction()
            .await
            .map_err(|e| storage_err("Failed to start session transaction", e))?;

        let writes: Result<(), mongodb::error::Error> = async {
            self.sessions
                .insert_one(session_doc)
                .session(&mut session)
                .await?;
            if !responses.is_empty() {
                self.responses
                    .insert_many(responses)
                    .session(&mut session)
                    .await?;
            }
            Ok(())
        }
        .await;

        match writes {
            Ok(()) => session
                .commit_transaction()
                .await
                .map_err(|e| storage_err("Failed to commit session transaction", e)),
            Err(e) => {
                let _ = session.abort_transaction().await;
                Err(storage_err("Session create transaction aborted", e))
            }
        }
    }

    async fn get(&self, id: &str) -> CoreResult<Option<TestSession>> {
        retry_with_backoff(RetryConfig::storage(), || async {
            self.sessions.find_one(doc! { "_id": id }).await
        })
        .await
        .map_err(|e| storage_err("Failed to load test session", e))
    }

    async fn list_responses(&self, session_id: &str) -> CoreResult<Vec<TestResponse>> {
        let cursor = self
            .responses
            .find(doc! { "session_id": session_id })
            .sort(doc! { "_id": 1 })
            .await
            .map_err(|e| storage_err("Failed to query test responses", e))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| storage_err("Failed to stream test responses", e))
    }

    async fn upsert_response(&self, response: &TestResponse) -> CoreResult<()> {
        self.responses
            .replace_one(doc! { "_id": &response.id }, response)
            .with_options(ReplaceOptions::builder().upsert(true).build())
            .await
            .map_err(|e| storage_err("Failed to upsert test response", e))?;
        Ok(())
    }

    async fn finish_with_responses(
        &self,
        session_doc: &TestSession,
        responses: &[TestResponse],
    ) -> CoreResult<()> {
        let mut session = self
            .client
            .start_session()
            .await
            .map_err(|e| storage_err("Failed to start storage session", e))?;
        session
            .start_transaction()
            .await
            .map_err(|e| storage_err("Failed to start grading transaction", e))?;

        let writes: Result<(), mongodb::error::Error> = async {
            self.sessions
                .replace_one(doc! { "_id": &session_doc.id }, session_doc)
                .session(&mut session)
                .await?;
            for response in responses {
                self.responses
                    .replace_one(doc! { "_id": &response.id }, response)
                    .with_options(ReplaceOptions::builder().upsert(true).build())
                    .session(&mut session)
                    .await?;
            }
            Ok(())
        }
        .await;

        match writes {
            Ok(()) => session
                .commit_transaction()
                .await
                .map_err(|e| storage_err("Failed to commit grading transaction", e)),
            Err(e) => {
                let _ = session.abort_transaction().await;
                Err(storage_err("Grading transaction aborted", e))
            }
        }
    }
}
