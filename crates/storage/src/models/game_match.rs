use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::StorageError;

/// Slot used to park a staged match that has no real court yet. The source
/// system wrote sentinel strings like "-1"/"-2"; any identifier outside the
/// session's configured list is treated as a bench slot.
pub const DEFAULT_BENCH_SLOT: &str = "-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Staged,
    Playing,
    Ended,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staged => "staged",
            Self::Playing => "playing",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staged" => Ok(Self::Staged),
            "playing" => Ok(Self::Playing),
            "ended" => Ok(Self::Ended),
            other => Err(StorageError::validation(format!(
                "unknown match status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Team {
    A,
    B,
}

impl Team {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Team {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            other => Err(StorageError::validation(format!("unknown team '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MatchOutcome {
    Win,
    Loss,
    Draw,
}

impl MatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Loss => "loss",
            Self::Draw => "draw",
        }
    }
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchOutcome {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "win" => Ok(Self::Win),
            "loss" => Ok(Self::Loss),
            "draw" => Ok(Self::Draw),
            other => Err(StorageError::validation(format!(
                "unknown match outcome '{other}'"
            ))),
        }
    }
}

/// Where a match sits: a real court from the session's configured list, or a
/// bench slot holding a pre-built pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourtRef {
    Real(String),
    Bench(String),
}

impl CourtRef {
    /// Classify a stored court identifier against the session's configured
    /// real-court list. Identifier comparison is case-insensitive, matching
    /// the source system. A missing identifier is the default bench slot.
    pub fn classify(stored: Option<&str>, configured: &[String]) -> Self {
        match stored {
            None => Self::Bench(DEFAULT_BENCH_SLOT.to_string()),
            Some(id) if configured.iter().any(|c| c.eq_ignore_ascii_case(id)) => {
                Self::Real(id.to_string())
            }
            Some(id) => Self::Bench(id.to_string()),
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            Self::Real(id) | Self::Bench(id) => id,
        }
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Self::Real(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GameMatch {
    pub match_id: Uuid,
    pub session_id: Uuid,
    /// Stored court identifier; interpreted through [`CourtRef::classify`].
    pub court: Option<String>,
    pub status: MatchStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl GameMatch {
    pub fn duration_minutes(&self) -> Option<i64> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some((end - start).num_minutes()),
            _ => None,
        }
    }
}

/// Places one participant on one side of one match.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MatchAssignment {
    pub assignment_id: Uuid,
    pub match_id: Uuid,
    pub participant_id: Uuid,
    pub team: Team,
    pub result: Option<MatchOutcome>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn courts(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn configured_identifier_is_real() {
        let r = CourtRef::classify(Some("2"), &courts(&["1", "2"]));
        assert_eq!(r, CourtRef::Real("2".into()));
        assert!(r.is_real());
    }

    #[test]
    fn sentinel_identifier_is_bench() {
        let r = CourtRef::classify(Some("-1"), &courts(&["1", "2"]));
        assert_eq!(r, CourtRef::Bench("-1".into()));
        assert!(!r.is_real());
    }

    #[test]
    fn missing_identifier_is_default_bench_slot() {
        let r = CourtRef::classify(None, &courts(&["1"]));
        assert_eq!(r.identifier(), DEFAULT_BENCH_SLOT);
    }

    #[test]
    fn classification_is_case_insensitive() {
        let r = CourtRef::classify(Some("court a"), &courts(&["Court A"]));
        assert!(r.is_real());
    }

    #[test]
    fn named_court_not_in_list_is_bench() {
        let r = CourtRef::classify(Some("3"), &courts(&["1", "2"]));
        assert_eq!(r, CourtRef::Bench("3".into()));
    }

    #[test]
    fn duration_requires_both_timestamps() {
        let now = Utc::now();
        let mut m = GameMatch {
            match_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            court: Some("1".into()),
            status: MatchStatus::Playing,
            started_at: Some(now),
            ended_at: None,
            created_at: now,
        };
        assert_eq!(m.duration_minutes(), None);
        m.ended_at = Some(now + chrono::Duration::minutes(23));
        assert_eq!(m.duration_minutes(), Some(23));
    }
}
