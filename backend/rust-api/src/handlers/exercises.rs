use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::{
    errors::CoreError,
    extractors::AppJson,
    models::{CheckAnswerRequest, ExerciseKind, ExerciseView},
    repositories::ExerciseFilter,
    services::{answer_service::AnswerService, AppState},
};

use super::require_user_id;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListExercisesQuery {
    pub kind: Option<ExerciseKind>,
    pub page: Option<u64>,
    pub size: Option<u64>,
}

pub async fn list_exercises(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListExercisesQuery>,
) -> Result<impl IntoResponse, CoreError> {
    let filter = ExerciseFilter {
        kind: query.kind,
        active_only: true,
    };
    let page = query.page.unwrap_or(0);
    let size = query.size.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);

    let exercises = state.repos.exercises.list(&filter, page, size).await?;
    let views: Vec<ExerciseView> = exercises.into_iter().map(ExerciseView::from).collect();
    Ok((StatusCode::OK, Json(views)))
}

pub async fn get_exercise(
    State(state): State<Arc<AppState>>,
    Path(exercise_id): Path<String>,
) -> Result<impl IntoResponse, CoreError> {
    let exercise = state
        .repos
        .exercises
        .get(&exercise_id)
        .await?
        .filter(|def| def.active)
        .ok_or(CoreError::ExerciseNotFound)?;

    Ok((StatusCode::OK, Json(ExerciseView::from(exercise))))
}

pub async fn check_answer(
    State(state): State<Arc<AppState>>,
    Path(exercise_id): Path<String>,
    headers: axum::http::HeaderMap,
    AppJson(req): AppJson<CheckAnswerRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let user_id = require_user_id(&headers)?;
    req.validate()
        .map_err(|e| CoreError::invalid_input(format!("Validation error: {}", e)))?;

    let service = AnswerService::new(&state);
    let response = service.check_answer(&exercise_id, &user_id, &req).await?;
    Ok((StatusCode::OK, Json(response)))
}
