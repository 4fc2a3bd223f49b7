use chrono::Utc;
use storage::{
    dto::{
        roster::RosterEntry,
        session::{
            CreateSessionRequest, SessionDetailResponse, SessionResponse, SessionSummary,
        },
    },
    error::StorageError,
    models::{ParticipantStatus, Session, SessionStatus},
    StoreOps,
};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::features::live;
use crate::features::roster::services::owned_session;
use crate::state::AppState;

pub async fn create_session(
    state: &AppState,
    caller_id: Uuid,
    request: &CreateSessionRequest,
) -> ApiResult<SessionResponse> {
    let mut tx = state.begin().await?;

    let session = Session {
        session_id: Uuid::new_v4(),
        owner_id: caller_id,
        group_name: request.group_name.clone(),
        max_participants: request.max_participants,
        number_of_courts: request.number_of_courts,
        configured_courts: request.court_identifiers.clone(),
        court_fee_per_person: request.court_fee_per_person,
        shuttlecock_fee_per_person: request.shuttlecock_fee_per_person,
        notes: request.notes.clone(),
        status: SessionStatus::Open,
        created_at: Utc::now(),
        updated_at: None,
    };
    tx.insert_session(&session).await?;
    tx.commit().await?;

    tracing::info!(session_id = %session.session_id, "Session created");

    Ok(SessionResponse::from(session))
}

/// Session details plus its roster, visible to any authenticated caller.
pub async fn get_session(state: &AppState, session_id: Uuid) -> ApiResult<SessionDetailResponse> {
    let mut tx = state.begin().await?;

    let session = tx
        .find_session(session_id)
        .await?
        .ok_or(StorageError::NotFound)?;

    let mut participants = tx.participants_in_session(session_id).await?;
    participants.sort_by_key(|p| (status_rank(p.status), p.waitlist_key()));

    Ok(SessionDetailResponse {
        session: SessionResponse::from(session),
        participants: participants
            .iter()
            .enumerate()
            .map(|(i, p)| RosterEntry::from_participant(i + 1, p))
            .collect(),
    })
}

fn status_rank(status: ParticipantStatus) -> u8 {
    match status {
        ParticipantStatus::Active => 0,
        ParticipantStatus::Waitlisted => 1,
        ParticipantStatus::Cancelled => 2,
    }
}

pub async fn my_sessions(state: &AppState, caller_id: Uuid) -> ApiResult<Vec<SessionSummary>> {
    let mut tx = state.begin().await?;

    let sessions = tx.sessions_owned_by(caller_id).await?;
    let mut summaries = Vec::with_capacity(sessions.len());
    for session in sessions {
        let active = tx
            .participants_in_session(session.session_id)
            .await?
            .iter()
            .filter(|p| p.status == ParticipantStatus::Active)
            .count() as i64;
        summaries.push(SessionSummary {
            session_id: session.session_id,
            group_name: session.group_name,
            status: session.status,
            max_participants: session.max_participants,
            active_participants: active,
            created_at: session.created_at,
        });
    }

    Ok(summaries)
}

/// Close the session to new remote joins once play begins. Walk-ins are
/// still allowed.
pub async fn start_session(
    state: &AppState,
    caller_id: Uuid,
    session_id: Uuid,
) -> ApiResult<SessionResponse> {
    let lock = state.session_lock(session_id);
    let _guard = lock.lock().await;

    let mut tx = state.begin().await?;

    let mut session = owned_session(tx.as_mut(), session_id, caller_id).await?;
    if session.status != SessionStatus::Open {
        return Err(StorageError::conflict("Session is not open").into());
    }

    session.status = SessionStatus::Started;
    session.updated_at = Some(Utc::now());
    tx.update_session(&session).await?;
    tx.commit().await?;

    tracing::info!(%session_id, "Session started");
    live::services::broadcast_after_commit(state, session_id);

    Ok(SessionResponse::from(session))
}

/// Cancel a session. The record stays for billing history; only the status
/// changes.
pub async fn cancel_session(
    state: &AppState,
    caller_id: Uuid,
    session_id: Uuid,
) -> ApiResult<SessionResponse> {
    let lock = state.session_lock(session_id);
    let _guard = lock.lock().await;

    let mut tx = state.begin().await?;

    let mut session = owned_session(tx.as_mut(), session_id, caller_id).await?;
    if session.status == SessionStatus::Cancelled {
        return Err(StorageError::conflict("Session is already cancelled").into());
    }

    session.status = SessionStatus::Cancelled;
    session.updated_at = Some(Utc::now());
    tx.update_session(&session).await?;
    tx.commit().await?;

    tracing::info!(%session_id, "Session cancelled");
    live::services::broadcast_after_commit(state, session_id);

    Ok(SessionResponse::from(session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::testing::*;
    use rust_decimal_macros::dec;

    fn create_request() -> CreateSessionRequest {
        CreateSessionRequest {
            group_name: "Saturday group".into(),
            max_participants: 16,
            number_of_courts: 3,
            court_identifiers: None,
            court_fee_per_person: Some(dec!(100)),
            shuttlecock_fee_per_person: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn created_session_starts_open_with_fallback_courts() {
        let state = test_state();
        let owner = Uuid::new_v4();

        let created = create_session(&state, owner, &create_request()).await.unwrap();
        assert_eq!(created.status, SessionStatus::Open);
        assert_eq!(created.court_identifiers, vec!["1", "2", "3"]);

        let detail = get_session(&state, created.session_id).await.unwrap();
        assert!(detail.participants.is_empty());
    }

    #[tokio::test]
    async fn my_sessions_lists_only_the_callers() {
        let state = test_state();
        let owner = Uuid::new_v4();

        create_session(&state, owner, &create_request()).await.unwrap();
        create_session(&state, Uuid::new_v4(), &create_request())
            .await
            .unwrap();

        let mine = my_sessions(&state, owner).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].active_participants, 0);
    }

    #[tokio::test]
    async fn cancel_is_owner_gated_and_single_shot() {
        let state = test_state();
        let session = seed_session(&state, |_| {}).await;

        let err = cancel_session(&state, Uuid::new_v4(), session.session_id)
            .await
            .unwrap_err();
        assert_forbidden(err);

        let cancelled = cancel_session(&state, session.owner_id, session.session_id)
            .await
            .unwrap();
        assert_eq!(cancelled.status, SessionStatus::Cancelled);

        let err = cancel_session(&state, session.owner_id, session.session_id)
            .await
            .unwrap_err();
        assert_conflict(err);
    }

    #[tokio::test]
    async fn starting_closes_the_session_to_remote_joins() {
        let state = test_state();
        let session = seed_session(&state, |_| {}).await;

        let started = start_session(&state, session.owner_id, session.session_id)
            .await
            .unwrap();
        assert_eq!(started.status, SessionStatus::Started);

        let err = start_session(&state, session.owner_id, session.session_id)
            .await
            .unwrap_err();
        assert_conflict(err);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let state = test_state();
        let err = get_session(&state, Uuid::new_v4()).await.unwrap_err();
        assert_not_found(err);
    }
}
