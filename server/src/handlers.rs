use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use numbrush_shared::{CanvasTemplate, CompleteSessionRequest, SaveSessionRequest, SessionSnapshot};

use crate::error::ApiError;
use crate::sessions;
use crate::state::AppState;

pub async fn ping_handler() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub async fn project_handler(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CanvasTemplate>, ApiError> {
    let template = sessions::get_template(&state, &project_id).await?;
    Ok(Json(template.as_ref().clone()))
}

pub async fn open_session_handler(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    sessions::open_session(&state, &project_id).await.map(Json)
}

pub async fn save_session_handler(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<SaveSessionRequest>, JsonRejection>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    sessions::save_session(&state, &session_id, request)
        .await
        .map(Json)
}

pub async fn complete_handler(
    State(state): State<AppState>,
    payload: Result<Json<CompleteSessionRequest>, JsonRejection>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    sessions::complete_session(&state, &request.session_id)
        .await
        .map(Json)
}

pub async fn render_handler(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let svg = sessions::render_session(&state, &session_id).await?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}
