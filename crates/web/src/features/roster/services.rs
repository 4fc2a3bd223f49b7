use chrono::Utc;
use storage::{
    dto::roster::{AddWalkinRequest, CheckInRequest, JoinOutcome, JoinSessionRequest, RosterEntry},
    error::StorageError,
    models::{Participant, ParticipantStatus, PlayerProfile, Session, SessionStatus},
    StoreOps,
};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::features::live;
use crate::state::AppState;

fn status_rank(status: ParticipantStatus) -> u8 {
    match status {
        ParticipantStatus::Active => 0,
        ParticipantStatus::Waitlisted => 1,
        ParticipantStatus::Cancelled => 2,
    }
}

async fn active_count(tx: &mut dyn StoreOps, session_id: Uuid) -> storage::Result<usize> {
    Ok(tx
        .participants_in_session(session_id)
        .await?
        .iter()
        .filter(|p| p.status == ParticipantStatus::Active)
        .count())
}

/// A member joins remotely. Fills a free slot if one exists, otherwise
/// lands on the waitlist; never exceeds the session capacity.
pub async fn join_session(
    state: &AppState,
    caller_id: Uuid,
    session_id: Uuid,
    request: &JoinSessionRequest,
) -> ApiResult<JoinOutcome> {
    let lock = state.session_lock(session_id);
    let _guard = lock.lock().await;

    let mut tx = state.begin().await?;

    let session = tx
        .find_session(session_id)
        .await?
        .ok_or(StorageError::NotFound)?;
    if session.status != SessionStatus::Open {
        return Err(StorageError::conflict("Session is not open for joining").into());
    }

    let existing = tx.participant_for_member(session_id, caller_id).await?;
    if let Some(p) = &existing {
        if p.status != ParticipantStatus::Cancelled {
            return Err(StorageError::conflict("You have already joined this session").into());
        }
    }

    let status = if active_count(tx.as_mut(), session_id).await? < session.max_participants as usize
    {
        ParticipantStatus::Active
    } else {
        ParticipantStatus::Waitlisted
    };

    let now = Utc::now();
    let participant_id = match existing {
        // Rejoining after a cancellation reuses the record but goes to the
        // back of the queue.
        Some(mut p) => {
            p.profile = PlayerProfile::Member {
                user_id: caller_id,
                nickname: request.nickname.clone(),
            };
            p.gender = request.gender;
            p.skill_level = request.skill_level.clone();
            p.status = status;
            p.joined_at = now;
            p.checked_in_at = None;
            p.checked_out_at = None;
            tx.update_participant(&p).await?;
            p.participant_id
        }
        None => {
            let participant = Participant {
                participant_id: Uuid::new_v4(),
                session_id,
                profile: PlayerProfile::Member {
                    user_id: caller_id,
                    nickname: request.nickname.clone(),
                },
                gender: request.gender,
                skill_level: request.skill_level.clone(),
                status,
                joined_at: now,
                checked_in_at: None,
                checked_out_at: None,
            };
            tx.insert_participant(&participant).await?;
            participant.participant_id
        }
    };

    tx.commit().await?;
    live::services::broadcast_after_commit(state, session_id);

    let message = match status {
        ParticipantStatus::Active => "You joined the session".to_string(),
        _ => "Session is full, you were added to the waitlist".to_string(),
    };

    Ok(JoinOutcome {
        participant_id,
        status,
        message,
    })
}

/// A member cancels their spot. Freeing an active slot promotes the
/// earliest-joined waitlisted participant in the same transaction.
pub async fn cancel_join(state: &AppState, caller_id: Uuid, session_id: Uuid) -> ApiResult<()> {
    let lock = state.session_lock(session_id);
    let _guard = lock.lock().await;

    let mut tx = state.begin().await?;

    tx.find_session(session_id)
        .await?
        .ok_or(StorageError::NotFound)?;

    let mut participant = tx
        .participant_for_member(session_id, caller_id)
        .await?
        .ok_or(StorageError::NotFound)?;
    if participant.status == ParticipantStatus::Cancelled {
        return Err(StorageError::conflict("You have already cancelled").into());
    }

    let freed_active_slot = participant.status == ParticipantStatus::Active;
    participant.status = ParticipantStatus::Cancelled;
    tx.update_participant(&participant).await?;

    if freed_active_slot {
        promote_next_waitlisted(tx.as_mut(), session_id).await?;
    }

    tx.commit().await?;
    live::services::broadcast_after_commit(state, session_id);

    Ok(())
}

/// Promote the earliest-joined waitlisted participant, if any. Listing
/// order is `(joined_at, participant_id)`, which is the promotion order.
async fn promote_next_waitlisted(
    tx: &mut dyn StoreOps,
    session_id: Uuid,
) -> storage::Result<()> {
    let next = tx
        .participants_in_session(session_id)
        .await?
        .into_iter()
        .find(|p| p.status == ParticipantStatus::Waitlisted);

    if let Some(mut promoted) = next {
        promoted.status = ParticipantStatus::Active;
        tx.update_participant(&promoted).await?;
    }

    Ok(())
}

/// The organizer registers a guest at the venue. The capacity decision is
/// the same as for a remote join; the guest is checked in immediately
/// either way.
pub async fn add_walkin(
    state: &AppState,
    caller_id: Uuid,
    session_id: Uuid,
    request: &AddWalkinRequest,
) -> ApiResult<JoinOutcome> {
    let lock = state.session_lock(session_id);
    let _guard = lock.lock().await;

    let mut tx = state.begin().await?;

    let session = owned_session(tx.as_mut(), session_id, caller_id).await?;
    if session.status == SessionStatus::Cancelled {
        return Err(StorageError::conflict("Session has been cancelled").into());
    }

    let status = if active_count(tx.as_mut(), session_id).await? < session.max_participants as usize
    {
        ParticipantStatus::Active
    } else {
        ParticipantStatus::Waitlisted
    };

    let now = Utc::now();
    let participant = Participant {
        participant_id: Uuid::new_v4(),
        session_id,
        profile: PlayerProfile::Guest {
            name: request.guest_name.clone(),
        },
        gender: request.gender,
        skill_level: request.skill_level.clone(),
        status,
        joined_at: now,
        checked_in_at: Some(now),
        checked_out_at: None,
    };
    tx.insert_participant(&participant).await?;

    tx.commit().await?;
    live::services::broadcast_after_commit(state, session_id);

    let message = match status {
        ParticipantStatus::Active => "Walk-in guest added".to_string(),
        _ => "Session is full, the guest was waitlisted".to_string(),
    };

    Ok(JoinOutcome {
        participant_id: participant.participant_id,
        status,
        message,
    })
}

/// The organizer marks a participant as arrived. Only active participants
/// check in, and only once.
pub async fn check_in(
    state: &AppState,
    caller_id: Uuid,
    session_id: Uuid,
    request: &CheckInRequest,
) -> ApiResult<()> {
    let lock = state.session_lock(session_id);
    let _guard = lock.lock().await;

    let mut tx = state.begin().await?;

    owned_session(tx.as_mut(), session_id, caller_id).await?;

    let mut participant = tx
        .find_participant(request.participant_id)
        .await?
        .filter(|p| p.session_id == session_id)
        .ok_or(StorageError::NotFound)?;
    match participant.status {
        ParticipantStatus::Active => {}
        ParticipantStatus::Waitlisted => {
            return Err(StorageError::conflict("Participant is on the waitlist").into());
        }
        ParticipantStatus::Cancelled => {
            return Err(StorageError::conflict("Participant has cancelled").into());
        }
    }
    if participant.is_checked_in() {
        return Err(StorageError::conflict("Participant is already checked in").into());
    }

    participant.checked_in_at = Some(Utc::now());
    tx.update_participant(&participant).await?;

    tx.commit().await?;
    live::services::broadcast_after_commit(state, session_id);

    Ok(())
}

/// Update a participant's skill label. Allowed for the session owner and
/// for the member the record belongs to.
pub async fn update_skill(
    state: &AppState,
    caller_id: Uuid,
    participant_id: Uuid,
    skill_level: Option<String>,
) -> ApiResult<()> {
    let mut tx = state.begin().await?;

    let mut participant = tx
        .find_participant(participant_id)
        .await?
        .ok_or(StorageError::NotFound)?;
    let session = tx
        .find_session(participant.session_id)
        .await?
        .ok_or(StorageError::NotFound)?;

    let is_self = participant.profile.member_user_id() == Some(caller_id);
    if !session.is_owned_by(caller_id) && !is_self {
        return Err(StorageError::Forbidden.into());
    }

    participant.skill_level = skill_level;
    tx.update_participant(&participant).await?;

    let session_id = participant.session_id;
    tx.commit().await?;
    live::services::broadcast_after_commit(state, session_id);

    Ok(())
}

/// The organizer's roster view, ordered active then waitlisted then
/// cancelled, each group by join time.
pub async fn session_roster(
    state: &AppState,
    caller_id: Uuid,
    session_id: Uuid,
) -> ApiResult<Vec<RosterEntry>> {
    let mut tx = state.begin().await?;

    owned_session(tx.as_mut(), session_id, caller_id).await?;

    let mut participants = tx.participants_in_session(session_id).await?;
    participants.sort_by_key(|p| (status_rank(p.status), p.waitlist_key()));
    tx.commit().await?;

    Ok(participants
        .iter()
        .enumerate()
        .map(|(i, p)| RosterEntry::from_participant(i + 1, p))
        .collect())
}

/// Look up a session and require the caller to own it.
pub(crate) async fn owned_session(
    tx: &mut dyn StoreOps,
    session_id: Uuid,
    caller_id: Uuid,
) -> storage::Result<Session> {
    let session = tx
        .find_session(session_id)
        .await?
        .ok_or(StorageError::NotFound)?;
    if !session.is_owned_by(caller_id) {
        return Err(StorageError::Forbidden);
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::testing::*;

    fn join_request(nickname: &str) -> JoinSessionRequest {
        JoinSessionRequest {
            nickname: nickname.to_string(),
            gender: None,
            skill_level: None,
        }
    }

    fn walkin_request(name: &str) -> AddWalkinRequest {
        AddWalkinRequest {
            guest_name: name.to_string(),
            gender: None,
            skill_level: None,
        }
    }

    #[tokio::test]
    async fn join_fills_slots_then_waitlists() {
        let state = test_state();
        let session = seed_session(&state, |s| s.max_participants = 2).await;

        for expected in [ParticipantStatus::Active, ParticipantStatus::Active] {
            let outcome = join_session(&state, Uuid::new_v4(), session.session_id, &join_request("P"))
                .await
                .unwrap();
            assert_eq!(outcome.status, expected);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let outcome = join_session(&state, Uuid::new_v4(), session.session_id, &join_request("Q"))
            .await
            .unwrap();
        assert_eq!(outcome.status, ParticipantStatus::Waitlisted);
    }

    #[tokio::test]
    async fn duplicate_join_is_rejected() {
        let state = test_state();
        let session = seed_session(&state, |_| {}).await;
        let user = Uuid::new_v4();

        join_session(&state, user, session.session_id, &join_request("Air"))
            .await
            .unwrap();
        let err = join_session(&state, user, session.session_id, &join_request("Air"))
            .await
            .unwrap_err();
        assert_conflict(err);
    }

    #[tokio::test]
    async fn join_requires_open_session() {
        let state = test_state();
        let session = seed_session(&state, |s| s.status = SessionStatus::Started).await;

        let err = join_session(&state, Uuid::new_v4(), session.session_id, &join_request("Air"))
            .await
            .unwrap_err();
        assert_conflict(err);
    }

    #[tokio::test]
    async fn cancelling_active_slot_promotes_earliest_waitlisted() {
        let state = test_state();
        let session = seed_session(&state, |s| s.max_participants = 2).await;
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        for user in [a, b, c] {
            join_session(&state, user, session.session_id, &join_request("P"))
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        cancel_join(&state, a, session.session_id).await.unwrap();

        let mut tx = state.begin().await.unwrap();
        let c_record = tx
            .participant_for_member(session.session_id, c)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(c_record.status, ParticipantStatus::Active);

        let active = active_count(tx.as_mut(), session.session_id).await.unwrap();
        assert_eq!(active, 2);
    }

    #[tokio::test]
    async fn cancelling_waitlisted_slot_promotes_nobody() {
        let state = test_state();
        let session = seed_session(&state, |s| s.max_participants = 1).await;
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        for user in [a, b, c] {
            join_session(&state, user, session.session_id, &join_request("P"))
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        cancel_join(&state, b, session.session_id).await.unwrap();

        let mut tx = state.begin().await.unwrap();
        let c_record = tx
            .participant_for_member(session.session_id, c)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(c_record.status, ParticipantStatus::Waitlisted);
    }

    #[tokio::test]
    async fn cancel_without_a_record_is_not_found() {
        let state = test_state();
        let session = seed_session(&state, |_| {}).await;

        let err = cancel_join(&state, Uuid::new_v4(), session.session_id)
            .await
            .unwrap_err();
        assert_not_found(err);
    }

    #[tokio::test]
    async fn rejoin_after_cancel_goes_to_back_of_queue() {
        let state = test_state();
        let session = seed_session(&state, |s| s.max_participants = 1).await;
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        join_session(&state, a, session.session_id, &join_request("A"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        join_session(&state, b, session.session_id, &join_request("B"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;

        cancel_join(&state, a, session.session_id).await.unwrap();
        let outcome = join_session(&state, a, session.session_id, &join_request("A"))
            .await
            .unwrap();
        assert_eq!(outcome.status, ParticipantStatus::Waitlisted);
    }

    #[tokio::test]
    async fn rejoiner_is_promoted_after_players_who_kept_waiting() {
        let state = test_state();
        let session = seed_session(&state, |s| s.max_participants = 1).await;
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        for (user, name) in [(a, "A"), (b, "B"), (c, "C")] {
            join_session(&state, user, session.session_id, &join_request(name))
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        // B cancels and rejoins, landing behind C in the queue.
        cancel_join(&state, b, session.session_id).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        join_session(&state, b, session.session_id, &join_request("B"))
            .await
            .unwrap();

        cancel_join(&state, a, session.session_id).await.unwrap();

        let roster = session_roster(&state, session.owner_id, session.session_id)
            .await
            .unwrap();
        let promoted: Vec<&str> = roster
            .iter()
            .filter(|r| r.status == ParticipantStatus::Active)
            .map(|r| r.display_name.as_str())
            .collect();
        assert_eq!(promoted, vec!["C"]);
    }

    #[tokio::test]
    async fn walkin_is_active_and_checked_in() {
        let state = test_state();
        let session = seed_session(&state, |_| {}).await;

        let outcome = add_walkin(
            &state,
            session.owner_id,
            session.session_id,
            &walkin_request("Guest"),
        )
        .await
        .unwrap();
        assert_eq!(outcome.status, ParticipantStatus::Active);

        let mut tx = state.begin().await.unwrap();
        let p = tx
            .find_participant(outcome.participant_id)
            .await
            .unwrap()
            .unwrap();
        assert!(p.is_checked_in());
        assert_eq!(p.profile.kind(), "guest");
    }

    #[tokio::test]
    async fn walkin_is_owner_only_and_waitlists_when_full() {
        let state = test_state();
        let session = seed_session(&state, |s| s.max_participants = 1).await;

        let err = add_walkin(
            &state,
            Uuid::new_v4(),
            session.session_id,
            &walkin_request("Guest"),
        )
        .await
        .unwrap_err();
        assert_forbidden(err);

        let first = add_walkin(
            &state,
            session.owner_id,
            session.session_id,
            &walkin_request("First"),
        )
        .await
        .unwrap();
        assert_eq!(first.status, ParticipantStatus::Active);

        let second = add_walkin(
            &state,
            session.owner_id,
            session.session_id,
            &walkin_request("Second"),
        )
        .await
        .unwrap();
        assert_eq!(second.status, ParticipantStatus::Waitlisted);
    }

    #[tokio::test]
    async fn check_in_marks_arrival_once() {
        let state = test_state();
        let session = seed_session(&state, |_| {}).await;
        let user = Uuid::new_v4();

        let joined = join_session(&state, user, session.session_id, &join_request("Air"))
            .await
            .unwrap();
        let request = CheckInRequest {
            participant_id: joined.participant_id,
        };

        check_in(&state, session.owner_id, session.session_id, &request)
            .await
            .unwrap();
        let err = check_in(&state, session.owner_id, session.session_id, &request)
            .await
            .unwrap_err();
        assert_conflict(err);
    }

    #[tokio::test]
    async fn waitlisted_participant_cannot_check_in() {
        let state = test_state();
        let session = seed_session(&state, |s| s.max_participants = 1).await;

        join_session(&state, Uuid::new_v4(), session.session_id, &join_request("A"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let waitlisted =
            join_session(&state, Uuid::new_v4(), session.session_id, &join_request("B"))
                .await
                .unwrap();
        assert_eq!(waitlisted.status, ParticipantStatus::Waitlisted);

        let err = check_in(
            &state,
            session.owner_id,
            session.session_id,
            &CheckInRequest {
                participant_id: waitlisted.participant_id,
            },
        )
        .await
        .unwrap_err();
        assert_conflict(err);
    }

    #[tokio::test]
    async fn update_skill_allowed_for_owner_and_self() {
        let state = test_state();
        let session = seed_session(&state, |_| {}).await;
        let user = Uuid::new_v4();

        let joined = join_session(&state, user, session.session_id, &join_request("Air"))
            .await
            .unwrap();

        update_skill(&state, user, joined.participant_id, Some("N".into()))
            .await
            .unwrap();
        update_skill(
            &state,
            session.owner_id,
            joined.participant_id,
            Some("S".into()),
        )
        .await
        .unwrap();

        let err = update_skill(&state, Uuid::new_v4(), joined.participant_id, None)
            .await
            .unwrap_err();
        assert_forbidden(err);
    }

    #[tokio::test]
    async fn roster_orders_by_status_then_join_time() {
        let state = test_state();
        let session = seed_session(&state, |s| s.max_participants = 2).await;
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        for (user, name) in [(a, "A"), (b, "B"), (c, "C")] {
            join_session(&state, user, session.session_id, &join_request(name))
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        cancel_join(&state, a, session.session_id).await.unwrap();

        let roster = session_roster(&state, session.owner_id, session.session_id)
            .await
            .unwrap();
        let names: Vec<&str> = roster.iter().map(|r| r.display_name.as_str()).collect();
        // B stayed active, C was promoted, A cancelled.
        assert_eq!(names, vec!["B", "C", "A"]);
        assert_eq!(roster[0].no, 1);
        assert_eq!(roster[2].status, ParticipantStatus::Cancelled);

        let err = session_roster(&state, Uuid::new_v4(), session.session_id)
            .await
            .unwrap_err();
        assert_forbidden(err);
    }
}
