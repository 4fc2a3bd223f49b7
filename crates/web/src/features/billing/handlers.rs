use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use storage::dto::billing::BillSummary;
use uuid::Uuid;

use crate::error::WebError;
use crate::middleware::auth::CallerId;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    post,
    path = "/api/participants/{participant_id}/checkout",
    params(
        ("participant_id" = Uuid, Path, description = "Participant id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Participant checked out and billed", body = BillSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not own the session"),
        (status = 404, description = "Participant not found"),
        (status = 409, description = "Already checked out")
    ),
    tag = "billing"
)]
pub async fn checkout(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(participant_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let bill = services::checkout(&state, caller_id, participant_id).await?;

    Ok((StatusCode::CREATED, Json(bill)).into_response())
}
