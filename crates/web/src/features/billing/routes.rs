use axum::{routing::post, Router};

use super::handlers::checkout;
use crate::state::AppState;

/// Participant-scoped billing routes, nested under `/api/participants`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/:participant_id/checkout", post(checkout))
}
