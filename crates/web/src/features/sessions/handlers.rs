use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use storage::dto::session::{
    CreateSessionRequest, SessionDetailResponse, SessionResponse, SessionSummary,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::WebError;
use crate::middleware::auth::CallerId;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    post,
    path = "/api/sessions",
    request_body = CreateSessionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Session created", body = SessionResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "sessions"
)]
pub async fn create_session(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let session = services::create_session(&state, caller_id, &req).await?;

    Ok((StatusCode::CREATED, Json(session)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/sessions/{session_id}",
    params(
        ("session_id" = Uuid, Path, description = "Session id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Session details and roster", body = SessionDetailResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Session not found")
    ),
    tag = "sessions"
)]
pub async fn get_session(
    State(state): State<AppState>,
    CallerId(_caller_id): CallerId,
    Path(session_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let detail = services::get_session(&state, session_id).await?;

    Ok(Json(detail).into_response())
}

#[utoipa::path(
    get,
    path = "/api/sessions/mine",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Sessions owned by the caller", body = Vec<SessionSummary>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "sessions"
)]
pub async fn my_sessions(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
) -> Result<Response, WebError> {
    let sessions = services::my_sessions(&state, caller_id).await?;

    Ok(Json(sessions).into_response())
}

#[utoipa::path(
    post,
    path = "/api/sessions/{session_id}/start",
    params(
        ("session_id" = Uuid, Path, description = "Session id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Session started", body = SessionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not own the session"),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session is not open")
    ),
    tag = "sessions"
)]
pub async fn start_session(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(session_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let session = services::start_session(&state, caller_id, session_id).await?;

    Ok(Json(session).into_response())
}

#[utoipa::path(
    post,
    path = "/api/sessions/{session_id}/cancel",
    params(
        ("session_id" = Uuid, Path, description = "Session id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Session cancelled", body = SessionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not own the session"),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session already cancelled")
    ),
    tag = "sessions"
)]
pub async fn cancel_session(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(session_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let session = services::cancel_session(&state, caller_id, session_id).await?;

    Ok(Json(session).into_response())
}
