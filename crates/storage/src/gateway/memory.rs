use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Bill, BillLineItem, GameMatch, MatchAssignment, MatchStatus, Participant, Session,
};

use super::{Gateway, GatewayTx, StoreOps};

/// In-memory persistence gateway for testing.
///
/// Transactions stage a cloned copy of the whole state and swap it in on
/// commit, so a dropped transaction leaves the shared state untouched.
/// Commits are serialized through the state mutex; callers are expected to
/// hold the per-session command lock, so two transactions never race on the
/// same session.
#[derive(Clone, Default)]
pub struct MemoryGateway {
    state: Arc<Mutex<State>>,
}

#[derive(Clone, Default)]
struct State {
    sessions: HashMap<Uuid, Session>,
    participants: HashMap<Uuid, Participant>,
    matches: HashMap<Uuid, GameMatch>,
    assignments: HashMap<Uuid, MatchAssignment>,
    bills: HashMap<Uuid, Bill>,
    bill_lines: HashMap<Uuid, BillLineItem>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn begin(&self) -> Result<Box<dyn GatewayTx>> {
        let staged = self.state.lock().clone();
        Ok(Box::new(MemoryTx {
            shared: Arc::clone(&self.state),
            staged,
        }))
    }
}

struct MemoryTx {
    shared: Arc<Mutex<State>>,
    staged: State,
}

#[async_trait]
impl GatewayTx for MemoryTx {
    async fn commit(self: Box<Self>) -> Result<()> {
        *self.shared.lock() = self.staged;
        Ok(())
    }
}

#[async_trait]
impl StoreOps for MemoryTx {
    async fn find_session(&mut self, session_id: Uuid) -> Result<Option<Session>> {
        Ok(self.staged.sessions.get(&session_id).cloned())
    }

    async fn insert_session(&mut self, session: &Session) -> Result<()> {
        self.staged
            .sessions
            .insert(session.session_id, session.clone());
        Ok(())
    }

    async fn update_session(&mut self, session: &Session) -> Result<()> {
        self.staged
            .sessions
            .insert(session.session_id, session.clone());
        Ok(())
    }

    async fn sessions_owned_by(&mut self, owner_id: Uuid) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .staged
            .sessions
            .values()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| (s.created_at, s.session_id));
        sessions.reverse();
        Ok(sessions)
    }

    async fn find_participant(&mut self, participant_id: Uuid) -> Result<Option<Participant>> {
        Ok(self.staged.participants.get(&participant_id).cloned())
    }

    async fn participant_for_member(
        &mut self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Participant>> {
        let mut matching: Vec<&Participant> = self
            .staged
            .participants
            .values()
            .filter(|p| {
                p.session_id == session_id && p.profile.member_user_id() == Some(user_id)
            })
            .collect();
        matching.sort_by_key(|p| p.waitlist_key());
        Ok(matching.first().map(|p| (*p).clone()))
    }

    async fn participants_in_session(&mut self, session_id: Uuid) -> Result<Vec<Participant>> {
        let mut participants: Vec<Participant> = self
            .staged
            .participants
            .values()
            .filter(|p| p.session_id == session_id)
            .cloned()
            .collect();
        participants.sort_by_key(|p| p.waitlist_key());
        Ok(participants)
    }

    async fn insert_participant(&mut self, participant: &Participant) -> Result<()> {
        self.staged
            .participants
            .insert(participant.participant_id, participant.clone());
        Ok(())
    }

    async fn update_participant(&mut self, participant: &Participant) -> Result<()> {
        self.staged
            .participants
            .insert(participant.participant_id, participant.clone());
        Ok(())
    }

    async fn find_match(&mut self, match_id: Uuid) -> Result<Option<GameMatch>> {
        Ok(self.staged.matches.get(&match_id).cloned())
    }

    async fn matches_by_status(
        &mut self,
        session_id: Uuid,
        status: MatchStatus,
    ) -> Result<Vec<GameMatch>> {
        let mut matches: Vec<GameMatch> = self
            .staged
            .matches
            .values()
            .filter(|m| m.session_id == session_id && m.status == status)
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.created_at, m.match_id));
        Ok(matches)
    }

    async fn playing_match_on_court(
        &mut self,
        session_id: Uuid,
        court: &str,
    ) -> Result<Option<GameMatch>> {
        Ok(self
            .staged
            .matches
            .values()
            .find(|m| {
                m.session_id == session_id
                    && m.status == MatchStatus::Playing
                    && m.court.as_deref() == Some(court)
            })
            .cloned())
    }

    async fn staged_match_on_slot(
        &mut self,
        session_id: Uuid,
        slot: &str,
    ) -> Result<Option<GameMatch>> {
        Ok(self
            .staged
            .matches
            .values()
            .find(|m| {
                m.session_id == session_id
                    && m.status == MatchStatus::Staged
                    && m.court.as_deref() == Some(slot)
            })
            .cloned())
    }

    async fn matches_for_participant(
        &mut self,
        session_id: Uuid,
        participant_id: Uuid,
    ) -> Result<Vec<GameMatch>> {
        let match_ids: HashSet<Uuid> = self
            .staged
            .assignments
            .values()
            .filter(|a| a.participant_id == participant_id)
            .map(|a| a.match_id)
            .collect();
        let mut matches: Vec<GameMatch> = self
            .staged
            .matches
            .values()
            .filter(|m| m.session_id == session_id && match_ids.contains(&m.match_id))
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.created_at, m.match_id));
        Ok(matches)
    }

    async fn insert_match(&mut self, game_match: &GameMatch) -> Result<()> {
        self.staged
            .matches
            .insert(game_match.match_id, game_match.clone());
        Ok(())
    }

    async fn update_match(&mut self, game_match: &GameMatch) -> Result<()> {
        self.staged
            .matches
            .insert(game_match.match_id, game_match.clone());
        Ok(())
    }

    async fn delete_match(&mut self, match_id: Uuid) -> Result<()> {
        self.staged.matches.remove(&match_id);
        self.staged.assignments.retain(|_, a| a.match_id != match_id);
        Ok(())
    }

    async fn assignments_for_match(&mut self, match_id: Uuid) -> Result<Vec<MatchAssignment>> {
        let mut assignments: Vec<MatchAssignment> = self
            .staged
            .assignments
            .values()
            .filter(|a| a.match_id == match_id)
            .cloned()
            .collect();
        assignments.sort_by_key(|a| (a.team.as_str(), a.assignment_id));
        Ok(assignments)
    }

    async fn insert_assignment(&mut self, assignment: &MatchAssignment) -> Result<()> {
        self.staged
            .assignments
            .insert(assignment.assignment_id, assignment.clone());
        Ok(())
    }

    async fn update_assignment(&mut self, assignment: &MatchAssignment) -> Result<()> {
        self.staged
            .assignments
            .insert(assignment.assignment_id, assignment.clone());
        Ok(())
    }

    async fn delete_assignments_for_match(&mut self, match_id: Uuid) -> Result<()> {
        self.staged.assignments.retain(|_, a| a.match_id != match_id);
        Ok(())
    }

    async fn participants_in_open_matches(
        &mut self,
        session_id: Uuid,
        exclude_match: Option<Uuid>,
    ) -> Result<HashSet<Uuid>> {
        let open_matches: HashSet<Uuid> = self
            .staged
            .matches
            .values()
            .filter(|m| {
                m.session_id == session_id
                    && m.status != MatchStatus::Ended
                    && Some(m.match_id) != exclude_match
            })
            .map(|m| m.match_id)
            .collect();
        Ok(self
            .staged
            .assignments
            .values()
            .filter(|a| open_matches.contains(&a.match_id))
            .map(|a| a.participant_id)
            .collect())
    }

    async fn insert_bill(&mut self, bill: &Bill, lines: &[BillLineItem]) -> Result<()> {
        self.staged.bills.insert(bill.bill_id, bill.clone());
        for line in lines {
            self.staged.bill_lines.insert(line.line_item_id, line.clone());
        }
        Ok(())
    }

    async fn bill_for_participant(&mut self, participant_id: Uuid) -> Result<Option<Bill>> {
        let mut bills: Vec<&Bill> = self
            .staged
            .bills
            .values()
            .filter(|b| b.participant_id == participant_id)
            .collect();
        bills.sort_by_key(|b| (b.created_at, b.bill_id));
        Ok(bills.first().map(|b| (*b).clone()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::models::{ParticipantStatus, PlayerProfile};

    use super::*;

    #[tokio::test]
    async fn update_participant_replaces_the_whole_record() {
        let gateway = MemoryGateway::new();
        let session_id = Uuid::new_v4();
        let mut participant = Participant {
            participant_id: Uuid::new_v4(),
            session_id,
            profile: PlayerProfile::Guest {
                name: "Air".into(),
            },
            gender: None,
            skill_level: None,
            status: ParticipantStatus::Waitlisted,
            joined_at: Utc::now(),
            checked_in_at: None,
            checked_out_at: None,
        };

        let mut tx = gateway.begin().await.unwrap();
        tx.insert_participant(&participant).await.unwrap();
        tx.commit().await.unwrap();

        // A cancelled player rejoining gets a fresh joined_at through this
        // same op; both backends must persist the moved queue position.
        participant.joined_at = participant.joined_at + Duration::minutes(5);
        participant.profile = PlayerProfile::Guest {
            name: "Air B.".into(),
        };
        let mut tx = gateway.begin().await.unwrap();
        tx.update_participant(&participant).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = gateway.begin().await.unwrap();
        let stored = tx
            .find_participant(participant.participant_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.joined_at, participant.joined_at);
        assert_eq!(stored.profile.display_name(), "Air B.");
    }
}
