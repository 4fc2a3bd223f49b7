use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{MatchOutcome, MatchStatus, Participant};

/// One player picked into a match roster
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlayerSelection {
    pub participant_id: Uuid,
}

/// Request payload for staging a pairing on a court or on the bench
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateStagedMatchRequest {
    /// A real-court identifier, a bench slot such as "-1", or omitted for
    /// the default bench slot.
    pub court_identifier: Option<String>,
    #[serde(default)]
    pub team_a: Vec<PlayerSelection>,
    #[serde(default)]
    pub team_b: Vec<PlayerSelection>,
}

/// Request payload for starting a match directly on a court
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct StartMatchRequest {
    #[validate(length(min = 1, max = 60))]
    pub court_identifier: String,
    pub team_a: Vec<PlayerSelection>,
    pub team_b: Vec<PlayerSelection>,
}

/// Request payload for promoting a staged match to playing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StartStagedMatchRequest {
    /// Used when the staged match sits on a bench slot.
    pub court_identifier: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubmitResultRequest {
    pub result: MatchOutcome,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Request payload for replacing the session's configured court list
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCourtsRequest {
    #[validate(length(min = 1, message = "At least one court identifier is required"))]
    #[validate(custom(function = "crate::dto::session::validate_court_identifiers"))]
    pub court_identifiers: Vec<String>,
}

/// One player as shown inside a match
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlayerInMatch {
    pub participant_id: Uuid,
    pub participant_type: String,
    pub display_name: String,
    pub gender: Option<i16>,
    pub skill_level: Option<String>,
}

impl PlayerInMatch {
    pub fn from_participant(p: &Participant) -> Self {
        Self {
            participant_id: p.participant_id,
            participant_type: p.profile.kind().to_string(),
            display_name: p.profile.display_name().to_string(),
            gender: p.gender,
            skill_level: p.skill_level.clone(),
        }
    }
}

/// A staged or playing match with both rosters resolved
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MatchView {
    pub match_id: Uuid,
    pub court_identifier: Option<String>,
    pub status: MatchStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub team_a: Vec<PlayerInMatch>,
    pub team_b: Vec<PlayerInMatch>,
}

impl MatchView {
    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut PlayerInMatch> {
        self.team_a.iter_mut().chain(self.team_b.iter_mut())
    }
}

/// A proposed pairing drawn from the waiting pool
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SuggestedMatch {
    pub team_a: Vec<crate::dto::roster::WaitingPlayer>,
    pub team_b: Vec<crate::dto::roster::WaitingPlayer>,
    pub reason: String,
}

/// One row of a participant's per-session match history
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MatchHistoryEntry {
    pub match_id: Uuid,
    pub court_identifier: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub result: Option<MatchOutcome>,
    pub teammates: Vec<PlayerInMatch>,
    pub opponents: Vec<PlayerInMatch>,
}

/// Derived per-participant statistics over ended matches
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlayerSessionStats {
    pub participant_id: Uuid,
    pub display_name: String,
    pub total_games: usize,
    pub wins: usize,
    pub losses: usize,
    pub total_minutes: i64,
    pub average_minutes: i64,
    pub history: Vec<MatchHistoryEntry>,
}
