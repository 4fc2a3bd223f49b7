use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Open,
    Started,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Started => "started",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "started" => Ok(Self::Started),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(StorageError::validation(format!(
                "unknown session status '{other}'"
            ))),
        }
    }
}

/// One scheduled play event: a capacity, a fee schedule, and a set of courts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Session {
    pub session_id: Uuid,
    pub owner_id: Uuid,
    pub group_name: String,
    pub max_participants: i32,
    pub number_of_courts: i32,
    /// Configured real-court identifiers. `None` or empty falls back to
    /// `1..=number_of_courts`.
    pub configured_courts: Option<Vec<String>>,
    pub court_fee_per_person: Option<Decimal>,
    pub shuttlecock_fee_per_person: Option<Decimal>,
    pub notes: Option<String>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Session {
    /// The real-court identifiers for this session, applying the numeric
    /// fallback when no explicit list is configured.
    pub fn court_identifiers(&self) -> Vec<String> {
        match &self.configured_courts {
            Some(courts) if !courts.is_empty() => courts.clone(),
            _ => (1..=self.number_of_courts.max(1))
                .map(|i| i.to_string())
                .collect(),
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(courts: Option<Vec<String>>, number_of_courts: i32) -> Session {
        Session {
            session_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            group_name: "Tuesday Smash".into(),
            max_participants: 12,
            number_of_courts,
            configured_courts: courts,
            court_fee_per_person: None,
            shuttlecock_fee_per_person: None,
            notes: None,
            status: SessionStatus::Open,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn configured_courts_take_precedence() {
        let session = session_with(Some(vec!["A".into(), "B".into()]), 4);
        assert_eq!(session.court_identifiers(), vec!["A", "B"]);
    }

    #[test]
    fn falls_back_to_numbered_courts() {
        let session = session_with(None, 3);
        assert_eq!(session.court_identifiers(), vec!["1", "2", "3"]);
    }

    #[test]
    fn empty_list_also_falls_back() {
        let session = session_with(Some(vec![]), 2);
        assert_eq!(session.court_identifiers(), vec!["1", "2"]);
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            SessionStatus::Open,
            SessionStatus::Started,
            SessionStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<SessionStatus>().unwrap(), status);
        }
        assert!("paused".parse::<SessionStatus>().is_err());
    }
}
