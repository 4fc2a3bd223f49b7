use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Session, SessionStatus};

use super::roster::RosterEntry;

/// Request payload for creating a new session
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSessionRequest {
    #[validate(length(
        min = 1,
        max = 120,
        message = "Group name must be between 1 and 120 characters"
    ))]
    pub group_name: String,

    #[validate(range(min = 1, max = 200, message = "Capacity must be between 1 and 200"))]
    pub max_participants: i32,

    #[validate(range(min = 1, max = 50, message = "Courts must be between 1 and 50"))]
    pub number_of_courts: i32,

    /// Explicit real-court identifiers; omitted means `1..=number_of_courts`.
    #[validate(custom(function = "validate_court_identifiers"))]
    pub court_identifiers: Option<Vec<String>>,

    pub court_fee_per_person: Option<Decimal>,

    pub shuttlecock_fee_per_person: Option<Decimal>,

    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

pub fn validate_court_identifiers(
    courts: &Vec<String>,
) -> Result<(), validator::ValidationError> {
    if courts.iter().any(|c| c.trim().is_empty()) {
        return Err(validator::ValidationError::new("empty_court_identifier"));
    }
    Ok(())
}

/// Response containing session details
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub group_name: String,
    pub status: SessionStatus,
    pub max_participants: i32,
    pub court_identifiers: Vec<String>,
    pub court_fee_per_person: Option<Decimal>,
    pub shuttlecock_fee_per_person: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        let court_identifiers = session.court_identifiers();
        Self {
            session_id: session.session_id,
            group_name: session.group_name,
            status: session.status,
            max_participants: session.max_participants,
            court_identifiers,
            court_fee_per_person: session.court_fee_per_person,
            shuttlecock_fee_per_person: session.shuttlecock_fee_per_person,
            notes: session.notes,
            created_at: session.created_at,
        }
    }
}

/// Session details plus its full roster, ordered by status then join time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionDetailResponse {
    pub session: SessionResponse,
    pub participants: Vec<RosterEntry>,
}

/// Abbreviated listing used for "my sessions".
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub group_name: String,
    pub status: SessionStatus,
    pub max_participants: i32,
    pub active_participants: i64,
    pub created_at: DateTime<Utc>,
}
