use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use storage::dto::roster::{
    AddWalkinRequest, CheckInRequest, JoinOutcome, JoinSessionRequest, RosterEntry,
    UpdateSkillRequest,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::WebError;
use crate::middleware::auth::CallerId;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    post,
    path = "/api/sessions/{session_id}/join",
    params(
        ("session_id" = Uuid, Path, description = "Session id")
    ),
    request_body = JoinSessionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Joined or waitlisted", body = JoinOutcome),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Already joined or session not open")
    ),
    tag = "roster"
)]
pub async fn join_session(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(session_id): Path<Uuid>,
    Json(req): Json<JoinSessionRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let outcome = services::join_session(&state, caller_id, session_id, &req).await?;

    Ok((StatusCode::CREATED, Json(outcome)).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{session_id}/join",
    params(
        ("session_id" = Uuid, Path, description = "Session id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 204, description = "Spot cancelled"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No spot to cancel"),
        (status = 409, description = "Already cancelled")
    ),
    tag = "roster"
)]
pub async fn cancel_join(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(session_id): Path<Uuid>,
) -> Result<Response, WebError> {
    services::cancel_join(&state, caller_id, session_id).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[utoipa::path(
    post,
    path = "/api/sessions/{session_id}/walkins",
    params(
        ("session_id" = Uuid, Path, description = "Session id")
    ),
    request_body = AddWalkinRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Walk-in guest added", body = JoinOutcome),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not own the session"),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session full or cancelled")
    ),
    tag = "roster"
)]
pub async fn add_walkin(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(session_id): Path<Uuid>,
    Json(req): Json<AddWalkinRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let outcome = services::add_walkin(&state, caller_id, session_id, &req).await?;

    Ok((StatusCode::CREATED, Json(outcome)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/sessions/{session_id}/checkin",
    params(
        ("session_id" = Uuid, Path, description = "Session id")
    ),
    request_body = CheckInRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 204, description = "Participant checked in"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not own the session"),
        (status = 404, description = "Session or participant not found"),
        (status = 409, description = "Already checked in or not eligible")
    ),
    tag = "roster"
)]
pub async fn check_in(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(session_id): Path<Uuid>,
    Json(req): Json<CheckInRequest>,
) -> Result<Response, WebError> {
    services::check_in(&state, caller_id, session_id, &req).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[utoipa::path(
    get,
    path = "/api/sessions/{session_id}/roster",
    params(
        ("session_id" = Uuid, Path, description = "Session id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Ordered roster of the session", body = Vec<RosterEntry>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not own the session"),
        (status = 404, description = "Session not found")
    ),
    tag = "roster"
)]
pub async fn session_roster(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(session_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let roster = services::session_roster(&state, caller_id, session_id).await?;

    Ok(Json(roster).into_response())
}

#[utoipa::path(
    put,
    path = "/api/participants/{participant_id}/skill",
    params(
        ("participant_id" = Uuid, Path, description = "Participant id")
    ),
    request_body = UpdateSkillRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 204, description = "Skill level updated"),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is neither owner nor the participant"),
        (status = 404, description = "Participant not found")
    ),
    tag = "roster"
)]
pub async fn update_skill(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(participant_id): Path<Uuid>,
    Json(req): Json<UpdateSkillRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    services::update_skill(&state, caller_id, participant_id, req.skill_level).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
