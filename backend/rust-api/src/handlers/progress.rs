use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{errors::CoreError, models::UserProgress, services::AppState};

use super::require_user_id;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

/// The caller's aggregate progress. Users who have never answered anything
/// get a zeroed row rather than a 404.
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, CoreError> {
    let user_id = require_user_id(&headers)?;

    let progress = match state.repos.progress.get(&user_id).await? {
        Some(progress) => progress,
        None => UserProgress::new(user_id, chrono::Utc::now()),
    };
    Ok((StatusCode::OK, Json(progress)))
}

#[derive(Debug, Deserialize)]
pub struct ListAttemptsQuery {
    pub exercise_id: Option<String>,
    pub page: Option<u64>,
    pub size: Option<u64>,
}

/// The caller's attempt history, newest first, optionally per exercise.
pub async fn list_attempts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListAttemptsQuery>,
) -> Result<impl IntoResponse, CoreError> {
    let user_id = require_user_id(&headers)?;
    let page = query.page.unwrap_or(0);
    let size = query.size.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);

    let attempts = state
        .repos
        .attempts
        .list(&user_id, query.exercise_id.as_deref(), page, size)
        .await?;
    Ok((StatusCode::OK, Json(attempts)))
}
