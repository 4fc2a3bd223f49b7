use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers::{
    create_staged_match, end_match, player_stats, start_match, start_staged_match, submit_result,
    suggest_match, update_courts,
};
use crate::state::AppState;

/// Session-scoped match routes, nested under `/api/sessions`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:session_id/matches", post(start_match))
        .route("/:session_id/staged-matches", post(create_staged_match))
        .route("/:session_id/suggested-matches", get(suggest_match))
        .route("/:session_id/courts", put(update_courts))
        .route(
            "/:session_id/participants/:participant_id/stats",
            get(player_stats),
        )
}

/// Match-scoped routes, nested under `/api/matches`.
pub fn match_routes() -> Router<AppState> {
    Router::new()
        .route("/:match_id/start", post(start_staged_match))
        .route("/:match_id/end", post(end_match))
        .route("/:match_id/result", post(submit_result))
}
