use axum::{routing::get, Router};

use super::handlers::{get_live_state, live_feed};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:session_id/live", get(get_live_state))
        .route("/:session_id/live/ws", get(live_feed))
}
