use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::matches::MatchView;
use super::roster::WaitingPlayer;

/// One configured real court and whatever currently sits on it
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourtStatus {
    pub court_identifier: String,
    pub current_match: Option<MatchView>,
}

/// The courts/bench/waiting-pool view pushed to every subscriber of a
/// session's channel after each mutation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LiveSessionState {
    pub group_name: String,
    pub courts: Vec<CourtStatus>,
    /// Staged matches parked on bench slots (identifier not in the
    /// configured court list).
    pub staged_matches: Vec<MatchView>,
    /// Checked-in players with no non-ended match, by check-in time.
    pub waiting_pool: Vec<WaitingPlayer>,
}
