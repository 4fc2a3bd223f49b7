use axum::{
    routing::{delete, get, post, put},
    Router,
};

use super::handlers::{
    add_walkin, cancel_join, check_in, join_session, session_roster, update_skill,
};
use crate::state::AppState;

/// Session-scoped roster routes, nested under `/api/sessions`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:session_id/join", post(join_session))
        .route("/:session_id/join", delete(cancel_join))
        .route("/:session_id/walkins", post(add_walkin))
        .route("/:session_id/checkin", post(check_in))
        .route("/:session_id/roster", get(session_roster))
}

/// Participant-scoped routes, nested under `/api/participants`.
pub fn participant_routes() -> Router<AppState> {
    Router::new().route("/:participant_id/skill", put(update_skill))
}
