pub mod billing;
pub mod live;
pub mod matches;
pub mod roster;
pub mod sessions;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use storage::error::StorageError;
    use storage::models::{
        GameMatch, MatchAssignment, MatchStatus, Participant, ParticipantStatus, PlayerProfile,
        Session, SessionStatus, Team,
    };
    use storage::{MemoryGateway, StoreOps};
    use uuid::Uuid;

    use crate::error::WebError;
    use crate::state::AppState;

    pub fn test_state() -> AppState {
        AppState::new(Arc::new(MemoryGateway::new()))
    }

    pub async fn seed_session(state: &AppState, customize: impl FnOnce(&mut Session)) -> Session {
        let mut session = Session {
            session_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            group_name: "Friday night".into(),
            max_participants: 20,
            number_of_courts: 2,
            configured_courts: None,
            court_fee_per_person: None,
            shuttlecock_fee_per_person: None,
            notes: None,
            status: SessionStatus::Open,
            created_at: Utc::now(),
            updated_at: None,
        };
        customize(&mut session);

        let mut tx = state.begin().await.unwrap();
        tx.insert_session(&session).await.unwrap();
        tx.commit().await.unwrap();
        session
    }

    /// Seed active, checked-in guests with strictly increasing join and
    /// check-in times, so FIFO ordering is deterministic.
    pub async fn seed_checked_in(
        state: &AppState,
        session: &Session,
        names: &[&str],
    ) -> Vec<Uuid> {
        let base = Utc::now();
        let mut ids = Vec::with_capacity(names.len());

        let mut tx = state.begin().await.unwrap();
        for (i, name) in names.iter().enumerate() {
            let at = base + Duration::milliseconds(i as i64);
            let participant = Participant {
                participant_id: Uuid::new_v4(),
                session_id: session.session_id,
                profile: PlayerProfile::Guest {
                    name: name.to_string(),
                },
                gender: None,
                skill_level: None,
                status: ParticipantStatus::Active,
                joined_at: at,
                checked_in_at: Some(at),
                checked_out_at: None,
            };
            tx.insert_participant(&participant).await.unwrap();
            ids.push(participant.participant_id);
        }
        tx.commit().await.unwrap();
        ids
    }

    pub async fn seed_member(
        state: &AppState,
        session: &Session,
        user_id: Uuid,
        nickname: &str,
    ) -> Uuid {
        let now = Utc::now();
        let participant = Participant {
            participant_id: Uuid::new_v4(),
            session_id: session.session_id,
            profile: PlayerProfile::Member {
                user_id,
                nickname: nickname.to_string(),
            },
            gender: None,
            skill_level: None,
            status: ParticipantStatus::Active,
            joined_at: now,
            checked_in_at: Some(now),
            checked_out_at: None,
        };

        let mut tx = state.begin().await.unwrap();
        tx.insert_participant(&participant).await.unwrap();
        tx.commit().await.unwrap();
        participant.participant_id
    }

    pub async fn seed_match(
        state: &AppState,
        session: &Session,
        court: Option<&str>,
        status: MatchStatus,
        sides: &[(Uuid, Team)],
    ) -> GameMatch {
        let now = Utc::now();
        let game_match = GameMatch {
            match_id: Uuid::new_v4(),
            session_id: session.session_id,
            court: court.map(str::to_string),
            status,
            started_at: (status != MatchStatus::Staged).then_some(now),
            ended_at: (status == MatchStatus::Ended).then_some(now),
            created_at: now,
        };

        let mut tx = state.begin().await.unwrap();
        tx.insert_match(&game_match).await.unwrap();
        for (participant_id, team) in sides {
            tx.insert_assignment(&MatchAssignment {
                assignment_id: Uuid::new_v4(),
                match_id: game_match.match_id,
                participant_id: *participant_id,
                team: *team,
                result: None,
                notes: None,
            })
            .await
            .unwrap();
        }
        tx.commit().await.unwrap();
        game_match
    }

    pub fn assert_forbidden(err: WebError) {
        assert!(
            matches!(err, WebError::Storage(StorageError::Forbidden)),
            "expected Forbidden, got {err:?}"
        );
    }

    pub fn assert_not_found(err: WebError) {
        assert!(
            matches!(err, WebError::Storage(StorageError::NotFound)),
            "expected NotFound, got {err:?}"
        );
    }

    pub fn assert_conflict(err: WebError) {
        assert!(
            matches!(err, WebError::Storage(StorageError::Conflict(_))),
            "expected Conflict, got {err:?}"
        );
    }
}
