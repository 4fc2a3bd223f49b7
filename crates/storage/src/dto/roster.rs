use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Participant, ParticipantStatus};

/// Request payload for a member joining a session remotely
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct JoinSessionRequest {
    #[validate(length(
        min = 1,
        max = 60,
        message = "Nickname must be between 1 and 60 characters"
    ))]
    pub nickname: String,

    pub gender: Option<i16>,

    #[validate(length(max = 60))]
    pub skill_level: Option<String>,
}

/// Outcome of a join: the slot taken (or the waitlist position implied by it)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JoinOutcome {
    pub participant_id: Uuid,
    pub status: ParticipantStatus,
    pub message: String,
}

/// Request payload for registering a walk-in guest on site
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AddWalkinRequest {
    #[validate(length(
        min = 1,
        max = 60,
        message = "Guest name must be between 1 and 60 characters"
    ))]
    pub guest_name: String,

    pub gender: Option<i16>,

    #[validate(length(max = 60))]
    pub skill_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckInRequest {
    pub participant_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateSkillRequest {
    #[validate(length(max = 60))]
    pub skill_level: Option<String>,
}

/// One checked-in player not currently assigned to any match
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WaitingPlayer {
    pub participant_id: Uuid,
    pub participant_type: String,
    pub display_name: String,
    pub gender: Option<i16>,
    pub skill_level: Option<String>,
    pub checked_in_at: DateTime<Utc>,
}

/// One row of the organizer's roster view
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RosterEntry {
    /// 1-based ordinal in display order
    pub no: usize,
    pub participant_id: Uuid,
    pub participant_type: String,
    pub display_name: String,
    pub gender: Option<i16>,
    pub skill_level: Option<String>,
    pub status: ParticipantStatus,
    pub is_checked_in: bool,
    pub joined_at: DateTime<Utc>,
}

impl RosterEntry {
    pub fn from_participant(no: usize, p: &Participant) -> Self {
        Self {
            no,
            participant_id: p.participant_id,
            participant_type: p.profile.kind().to_string(),
            display_name: p.profile.display_name().to_string(),
            gender: p.gender,
            skill_level: p.skill_level.clone(),
            status: p.status,
            is_checked_in: p.is_checked_in(),
            joined_at: p.joined_at,
        }
    }
}
