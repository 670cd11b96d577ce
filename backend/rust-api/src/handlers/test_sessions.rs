use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    errors::CoreError,
    extractors::AppJson,
    models::{CreateTestSessionRequest, SubmitResponseRequest},
    services::{session_service::TestSessionService, AppState},
};

use super::require_user_id;

pub async fn create_test_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppJson(req): AppJson<CreateTestSessionRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let user_id = require_user_id(&headers)?;
    req.validate()
        .map_err(|e| CoreError::invalid_input(format!("Validation error: {}", e)))?;

    let service = TestSessionService::new(&state);
    let view = service.create_session(&user_id, &req).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_test_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, CoreError> {
    let user_id = require_user_id(&headers)?;

    let service = TestSessionService::new(&state);
    let view = service.get_session(&session_id, &user_id).await?;
    Ok((StatusCode::OK, Json(view)))
}

pub async fn submit_response(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    AppJson(req): AppJson<SubmitResponseRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let user_id = require_user_id(&headers)?;
    req.validate()
        .map_err(|e| CoreError::invalid_input(format!("Validation error: {}", e)))?;

    let service = TestSessionService::new(&state);
    let response = service.submit_response(&session_id, &user_id, &req).await?;
    Ok((StatusCode::OK, Json(response)))
}

pub async fn submit_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, CoreError> {
    let user_id = require_user_id(&headers)?;

    let service = TestSessionService::new(&state);
    let session = service.grade(&session_id, &user_id).await?;
    Ok((StatusCode::OK, Json(session)))
}

pub async fn abandon_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, CoreError> {
    let user_id = require_user_id(&headers)?;

    let service = TestSessionService::new(&state);
    let session = service.abandon(&session_id, &user_id).await?;
    Ok((StatusCode::OK, Json(session)))
}
