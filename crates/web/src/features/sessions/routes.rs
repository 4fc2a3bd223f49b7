use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{cancel_session, create_session, get_session, my_sessions, start_session};
use crate::state::AppState;

/// Session CRUD routes, nested under `/api/sessions`. `/mine` is registered
/// before the id routes so it never parses as a session id.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/mine", get(my_sessions))
        .route("/:session_id", get(get_session))
        .route("/:session_id/start", post(start_session))
        .route("/:session_id/cancel", post(cancel_session))
}
