use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::StorageError;

/// Who is occupying a slot: a registered member or a walk-in guest.
///
/// Replaces the source schema's pair of nullable foreign keys with an
/// explicit tagged variant; every lookup branches on the tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlayerProfile {
    Member { user_id: Uuid, nickname: String },
    Guest { name: String },
}

impl PlayerProfile {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Member { nickname, .. } => nickname,
            Self::Guest { name } => name,
        }
    }

    pub fn member_user_id(&self) -> Option<Uuid> {
        match self {
            Self::Member { user_id, .. } => Some(*user_id),
            Self::Guest { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Member { .. } => "member",
            Self::Guest { .. } => "guest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Active,
    Waitlisted,
    Cancelled,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Waitlisted => "waitlisted",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "waitlisted" => Ok(Self::Waitlisted),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(StorageError::validation(format!(
                "unknown participant status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Participant {
    pub participant_id: Uuid,
    pub session_id: Uuid,
    pub profile: PlayerProfile,
    pub gender: Option<i16>,
    pub skill_level: Option<String>,
    pub status: ParticipantStatus,
    pub joined_at: DateTime<Utc>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub checked_out_at: Option<DateTime<Utc>>,
}

impl Participant {
    /// FIFO ordering key for waitlist promotion: join time, then identity.
    pub fn waitlist_key(&self) -> (DateTime<Utc>, Uuid) {
        (self.joined_at, self.participant_id)
    }

    pub fn is_checked_in(&self) -> bool {
        self.checked_in_at.is_some()
    }

    /// Checked in and not yet checked out, i.e. present on site.
    pub fn is_present(&self) -> bool {
        self.checked_in_at.is_some() && self.checked_out_at.is_none()
    }
}
