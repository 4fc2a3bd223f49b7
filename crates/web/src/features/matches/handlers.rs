use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use storage::dto::matches::{
    CreateStagedMatchRequest, MatchView, PlayerSessionStats, StartMatchRequest,
    StartStagedMatchRequest, SubmitResultRequest, SuggestedMatch, UpdateCourtsRequest,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::WebError;
use crate::middleware::auth::CallerId;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    post,
    path = "/api/sessions/{session_id}/staged-matches",
    params(
        ("session_id" = Uuid, Path, description = "Session id")
    ),
    request_body = CreateStagedMatchRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Staged match created, replaced, or removed", body = MatchView),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not own the session"),
        (status = 404, description = "Session or participant not found"),
        (status = 409, description = "A selected player is already in a match")
    ),
    tag = "matches"
)]
pub async fn create_staged_match(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(session_id): Path<Uuid>,
    Json(req): Json<CreateStagedMatchRequest>,
) -> Result<Response, WebError> {
    let view = services::create_staged_match(&state, caller_id, session_id, &req).await?;

    Ok(Json(view).into_response())
}

#[utoipa::path(
    post,
    path = "/api/sessions/{session_id}/matches",
    params(
        ("session_id" = Uuid, Path, description = "Session id")
    ),
    request_body = StartMatchRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Match started", body = MatchView),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not own the session"),
        (status = 404, description = "Session or participant not found"),
        (status = 409, description = "Court occupied or player already in a match")
    ),
    tag = "matches"
)]
pub async fn start_match(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(session_id): Path<Uuid>,
    Json(req): Json<StartMatchRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let view = services::start_match(&state, caller_id, session_id, &req).await?;

    Ok((StatusCode::CREATED, Json(view)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/matches/{match_id}/start",
    params(
        ("match_id" = Uuid, Path, description = "Match id")
    ),
    request_body = StartStagedMatchRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Staged match promoted to playing", body = MatchView),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not own the session"),
        (status = 404, description = "Match not found"),
        (status = 409, description = "Court occupied or no court determined")
    ),
    tag = "matches"
)]
pub async fn start_staged_match(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(match_id): Path<Uuid>,
    Json(req): Json<StartStagedMatchRequest>,
) -> Result<Response, WebError> {
    let view = services::start_staged_match(&state, caller_id, match_id, &req).await?;

    Ok(Json(view).into_response())
}

#[utoipa::path(
    post,
    path = "/api/matches/{match_id}/end",
    params(
        ("match_id" = Uuid, Path, description = "Match id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Match ended", body = MatchView),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not own the session"),
        (status = 404, description = "Match not found"),
        (status = 409, description = "Match is not playing")
    ),
    tag = "matches"
)]
pub async fn end_match(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(match_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let view = services::end_match(&state, caller_id, match_id).await?;

    Ok(Json(view).into_response())
}

#[utoipa::path(
    post,
    path = "/api/matches/{match_id}/result",
    params(
        ("match_id" = Uuid, Path, description = "Match id")
    ),
    request_body = SubmitResultRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 204, description = "Result recorded"),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Match not found or caller not in it")
    ),
    tag = "matches"
)]
pub async fn submit_result(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(match_id): Path<Uuid>,
    Json(req): Json<SubmitResultRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    services::submit_result(&state, caller_id, match_id, &req).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[utoipa::path(
    put,
    path = "/api/sessions/{session_id}/courts",
    params(
        ("session_id" = Uuid, Path, description = "Session id")
    ),
    request_body = UpdateCourtsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Configured court list replaced", body = Vec<String>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not own the session"),
        (status = 404, description = "Session not found")
    ),
    tag = "matches"
)]
pub async fn update_courts(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(session_id): Path<Uuid>,
    Json(req): Json<UpdateCourtsRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let courts = services::update_courts(&state, caller_id, session_id, &req).await?;

    Ok(Json(courts).into_response())
}

#[utoipa::path(
    get,
    path = "/api/sessions/{session_id}/participants/{participant_id}/stats",
    params(
        ("session_id" = Uuid, Path, description = "Session id"),
        ("participant_id" = Uuid, Path, description = "Participant id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Match history and derived statistics", body = PlayerSessionStats),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is neither owner nor the participant"),
        (status = 404, description = "Session or participant not found")
    ),
    tag = "matches"
)]
pub async fn player_stats(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path((session_id, participant_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, WebError> {
    let stats = services::player_stats(&state, caller_id, session_id, participant_id).await?;

    Ok(Json(stats).into_response())
}

#[utoipa::path(
    get,
    path = "/api/sessions/{session_id}/suggested-matches",
    params(
        ("session_id" = Uuid, Path, description = "Session id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Proposed pairings from the waiting pool, empty when fewer than four players are waiting", body = Vec<SuggestedMatch>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not own the session"),
        (status = 404, description = "Session not found")
    ),
    tag = "matches"
)]
pub async fn suggest_match(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(session_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let suggestions = services::suggest_match(&state, caller_id, session_id).await?;

    Ok(Json(suggestions).into_response())
}
