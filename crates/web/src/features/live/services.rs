use storage::{
    dto::{
        live::{CourtStatus, LiveSessionState},
        matches::{MatchView, PlayerInMatch},
        roster::WaitingPlayer,
    },
    error::{Result, StorageError},
    models::{CourtRef, GameMatch, MatchStatus, Session},
    services::display_names,
    StoreOps,
};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

/// Resolve a match's two rosters into a view.
pub async fn match_view(tx: &mut dyn StoreOps, game_match: &GameMatch) -> Result<MatchView> {
    let mut team_a = Vec::new();
    let mut team_b = Vec::new();

    for assignment in tx.assignments_for_match(game_match.match_id).await? {
        let Some(participant) = tx.find_participant(assignment.participant_id).await? else {
            continue;
        };
        let player = PlayerInMatch::from_participant(&participant);
        match assignment.team {
            storage::models::Team::A => team_a.push(player),
            storage::models::Team::B => team_b.push(player),
        }
    }

    Ok(MatchView {
        match_id: game_match.match_id,
        court_identifier: game_match.court.clone(),
        status: game_match.status,
        started_at: game_match.started_at,
        team_a,
        team_b,
    })
}

fn sits_on(game_match: &GameMatch, court: &str, configured: &[String]) -> bool {
    match CourtRef::classify(game_match.court.as_deref(), configured) {
        CourtRef::Real(id) => id.eq_ignore_ascii_case(court),
        CourtRef::Bench(_) => false,
    }
}

/// Present participants with no staged or playing match, longest waiting
/// first. Shared between the projection and the match suggester.
pub(crate) async fn waiting_pool(
    tx: &mut dyn StoreOps,
    session_id: Uuid,
) -> Result<Vec<WaitingPlayer>> {
    let busy = tx.participants_in_open_matches(session_id, None).await?;
    let mut pool: Vec<WaitingPlayer> = tx
        .participants_in_session(session_id)
        .await?
        .iter()
        .filter(|p| p.is_present() && !busy.contains(&p.participant_id))
        .filter_map(|p| {
            let checked_in_at = p.checked_in_at?;
            Some(WaitingPlayer {
                participant_id: p.participant_id,
                participant_type: p.profile.kind().to_string(),
                display_name: p.profile.display_name().to_string(),
                gender: p.gender,
                skill_level: p.skill_level.clone(),
                checked_in_at,
            })
        })
        .collect();
    pool.sort_by_key(|w| (w.checked_in_at, w.participant_id));
    Ok(pool)
}

/// Build the full courts/bench/waiting-pool snapshot of a session.
///
/// A configured court shows its playing match if one exists, otherwise a
/// staged match parked on it, otherwise nothing. Staged matches whose
/// identifier is not a configured court land in the bench list. The waiting
/// pool holds every present participant with no staged or playing match,
/// ordered by check-in time.
pub async fn project(tx: &mut dyn StoreOps, session: &Session) -> Result<LiveSessionState> {
    let configured = session.court_identifiers();

    let playing = tx
        .matches_by_status(session.session_id, MatchStatus::Playing)
        .await?;
    let staged = tx
        .matches_by_status(session.session_id, MatchStatus::Staged)
        .await?;

    let mut courts = Vec::with_capacity(configured.len());
    for court in &configured {
        let current = if let Some(m) = playing.iter().find(|m| sits_on(m, court, &configured)) {
            Some(match_view(tx, m).await?)
        } else if let Some(m) = staged.iter().find(|m| sits_on(m, court, &configured)) {
            Some(match_view(tx, m).await?)
        } else {
            None
        };
        courts.push(CourtStatus {
            court_identifier: court.clone(),
            current_match: current,
        });
    }

    let mut staged_matches = Vec::new();
    for m in &staged {
        if !CourtRef::classify(m.court.as_deref(), &configured).is_real() {
            staged_matches.push(match_view(tx, m).await?);
        }
    }

    let waiting_pool = waiting_pool(tx, session.session_id).await?;

    let mut state = LiveSessionState {
        group_name: session.group_name.clone(),
        courts,
        staged_matches,
        waiting_pool,
    };

    let mut names: Vec<&mut String> = Vec::new();
    for court in &mut state.courts {
        if let Some(m) = &mut court.current_match {
            for player in m.players_mut() {
                names.push(&mut player.display_name);
            }
        }
    }
    for m in &mut state.staged_matches {
        for player in m.players_mut() {
            names.push(&mut player.display_name);
        }
    }
    for waiting in &mut state.waiting_pool {
        names.push(&mut waiting.display_name);
    }
    display_names::disambiguate(names);

    Ok(state)
}

/// Owner-gated on-demand snapshot.
pub async fn get_live_state(
    state: &AppState,
    caller_id: Uuid,
    session_id: Uuid,
) -> ApiResult<LiveSessionState> {
    let mut tx = state.begin().await?;

    let session = tx
        .find_session(session_id)
        .await?
        .ok_or(StorageError::NotFound)?;
    if !session.is_owned_by(caller_id) {
        return Err(StorageError::Forbidden.into());
    }

    let snapshot = project(tx.as_mut(), &session).await?;
    tx.commit().await?;

    Ok(snapshot)
}

/// Snapshot without the ownership gate, for callers already authorized.
pub async fn get_snapshot(
    state: &AppState,
    session_id: Uuid,
) -> Result<Option<LiveSessionState>> {
    let mut tx = state.begin().await?;
    let Some(session) = tx.find_session(session_id).await? else {
        return Ok(None);
    };
    let snapshot = project(tx.as_mut(), &session).await?;
    tx.commit().await?;
    Ok(Some(snapshot))
}

/// Re-project a session and push the snapshot to its subscribers.
///
/// Called after a mutation commits. Runs detached from the request so a
/// projection failure never turns a committed command into an error.
pub fn broadcast_after_commit(state: &AppState, session_id: Uuid) {
    let state = state.clone();
    tokio::spawn(async move {
        let result: storage::Result<()> = async {
            let mut tx = state.begin().await?;
            let Some(session) = tx.find_session(session_id).await? else {
                return Ok(());
            };
            let snapshot = project(tx.as_mut(), &session).await?;
            tx.commit().await?;
            state.hub().publish(session_id, snapshot);
            Ok(())
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(%session_id, "Live state broadcast failed: {e}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::testing::*;
    use storage::models::Team;

    #[tokio::test]
    async fn empty_session_projects_empty_courts() {
        let state = test_state();
        let session = seed_session(&state, |s| {
            s.configured_courts = Some(vec!["1".into(), "2".into()]);
        })
        .await;

        let mut tx = state.begin().await.unwrap();
        let snapshot = project(tx.as_mut(), &session).await.unwrap();

        assert_eq!(snapshot.courts.len(), 2);
        assert!(snapshot.courts.iter().all(|c| c.current_match.is_none()));
        assert!(snapshot.staged_matches.is_empty());
        assert!(snapshot.waiting_pool.is_empty());
    }

    #[tokio::test]
    async fn playing_match_shows_on_its_court() {
        let state = test_state();
        let session = seed_session(&state, |s| {
            s.configured_courts = Some(vec!["1".into(), "2".into()]);
        })
        .await;
        let players = seed_checked_in(&state, &session, &["Air", "Bank", "Chai", "Dao"]).await;
        seed_match(
            &state,
            &session,
            Some("2"),
            MatchStatus::Playing,
            &[
                (players[0], Team::A),
                (players[1], Team::A),
                (players[2], Team::B),
                (players[3], Team::B),
            ],
        )
        .await;

        let mut tx = state.begin().await.unwrap();
        let snapshot = project(tx.as_mut(), &session).await.unwrap();

        assert!(snapshot.courts[0].current_match.is_none());
        let on_court = snapshot.courts[1].current_match.as_ref().unwrap();
        assert_eq!(on_court.status, MatchStatus::Playing);
        assert_eq!(on_court.team_a.len(), 2);
        assert!(snapshot.waiting_pool.is_empty());
    }

    #[tokio::test]
    async fn bench_staged_match_and_waiting_pool() {
        let state = test_state();
        let session = seed_session(&state, |s| {
            s.configured_courts = Some(vec!["1".into()]);
        })
        .await;
        let players = seed_checked_in(&state, &session, &["Air", "Bank", "Chai"]).await;
        seed_match(
            &state,
            &session,
            Some("-1"),
            MatchStatus::Staged,
            &[(players[0], Team::A), (players[1], Team::B)],
        )
        .await;

        let mut tx = state.begin().await.unwrap();
        let snapshot = project(tx.as_mut(), &session).await.unwrap();

        assert!(snapshot.courts[0].current_match.is_none());
        assert_eq!(snapshot.staged_matches.len(), 1);
        assert_eq!(snapshot.waiting_pool.len(), 1);
        assert_eq!(snapshot.waiting_pool[0].display_name, "Chai");
    }

    #[tokio::test]
    async fn staged_match_on_real_court_occupies_it() {
        let state = test_state();
        let session = seed_session(&state, |s| {
            s.configured_courts = Some(vec!["1".into(), "2".into()]);
        })
        .await;
        let players = seed_checked_in(&state, &session, &["Air", "Bank"]).await;
        seed_match(
            &state,
            &session,
            Some("1"),
            MatchStatus::Staged,
            &[(players[0], Team::A), (players[1], Team::B)],
        )
        .await;

        let mut tx = state.begin().await.unwrap();
        let snapshot = project(tx.as_mut(), &session).await.unwrap();

        let on_court = snapshot.courts[0].current_match.as_ref().unwrap();
        assert_eq!(on_court.status, MatchStatus::Staged);
        assert!(snapshot.staged_matches.is_empty());
    }

    #[tokio::test]
    async fn duplicate_names_disambiguated_across_snapshot() {
        let state = test_state();
        let session = seed_session(&state, |s| {
            s.configured_courts = Some(vec!["1".into()]);
        })
        .await;
        let players = seed_checked_in(&state, &session, &["Air", "Air", "Air"]).await;
        seed_match(
            &state,
            &session,
            Some("1"),
            MatchStatus::Playing,
            &[(players[0], Team::A), (players[1], Team::B)],
        )
        .await;

        let mut tx = state.begin().await.unwrap();
        let snapshot = project(tx.as_mut(), &session).await.unwrap();

        let on_court = snapshot.courts[0].current_match.as_ref().unwrap();
        assert_eq!(on_court.team_a[0].display_name, "Air");
        assert_eq!(on_court.team_b[0].display_name, "Air (2)");
        assert_eq!(snapshot.waiting_pool[0].display_name, "Air (3)");
    }

    #[tokio::test]
    async fn live_state_is_owner_gated() {
        let state = test_state();
        let session = seed_session(&state, |_| {}).await;

        let err = get_live_state(&state, uuid::Uuid::new_v4(), session.session_id)
            .await
            .unwrap_err();
        assert_forbidden(err);

        let snapshot = get_live_state(&state, session.owner_id, session.session_id)
            .await
            .unwrap();
        assert_eq!(snapshot.group_name, session.group_name);
    }
}
