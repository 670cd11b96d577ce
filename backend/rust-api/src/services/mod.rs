use std::sync::Arc;

use mongodb::{Client as MongoClient, Database};
use redis::aio::ConnectionManager;

use crate::config::Config;
use crate::repositories::memory::MemoryStore;
use crate::repositories::{mongo, Repositories};

pub struct AppState {
    pub config: Config,
    pub repos: Repositories,
    /// Present only when MongoDB-backed; used by the health endpoint.
    pub mongo: Option<Database>,
    pub redis: Option<ConnectionManager>,
    pub evaluator: evaluator::AnswerEvaluator,
}

impl AppState {
    pub async fn new(
        config: Config,
        mongo_client: MongoClient,
        redis_client: Option<redis::Client>,
    ) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);
        let repos = mongo::build_repositories(&mongo_client, &mongo);

        let redis = match redis_client {
            Some(client) => {
                tracing::info!("Attempting to connect to Redis...");

                let manager = tokio::time::timeout(
                    std::time::Duration::from_secs(30),
                    ConnectionManager::new(client),
                )
                .await
                .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

                // Test connection
                let mut conn = manager.clone();
                tokio::time::timeout(
                    std::time::Duration::from_secs(5),
                    redis::cmd("PING").query_async::<String>(&mut conn),
                )
                .await
                .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

                tracing::info!("Redis connection established successfully");
                Some(manager)
            }
            None => {
                tracing::warn!("No Redis configured, running without caches");
                None
            }
        };

        let evaluator = Self::build_evaluator(&config);

        Ok(Self {
            config,
            repos,
            mongo: Some(mongo),
            redis,
            evaluator,
        })
    }

    /// State backed by the in-memory store; used by the integration test
    /// harness and storage-less local runs.
    pub fn in_memory(config: Config, store: &MemoryStore) -> Self {
        Self {
            config,
            repos: store.repositories(),
            mongo: None,
            redis: None,
            evaluator: evaluator::AnswerEvaluator::without_speech(),
        }
    }

    fn build_evaluator(config: &Config) -> evaluator::AnswerEvaluator {
        match &config.speech_api_url {
            Some(url) => {
                tracing::info!("Speech capabilities enabled via {}", url);
                let gateway = Arc::new(speech::HttpSpeechGateway::new(url.clone()));
                evaluator::AnswerEvaluator::new(Some(gateway.clone()), Some(gateway))
            }
            None => {
                tracing::warn!(
                    "No speech service configured; speaking exercises will answer 503"
                );
                evaluator::AnswerEvaluator::without_speech()
            }
        }
    }
}

pub mod answer_service;
pub mod attempt_recorder;
pub mod evaluator;
pub mod feedback;
pub mod progress_updater;
pub mod session_service;
pub mod speech;
