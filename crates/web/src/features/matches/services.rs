use std::collections::HashSet;

use chrono::Utc;
use storage::{
    dto::matches::{
        CreateStagedMatchRequest, MatchHistoryEntry, MatchView, PlayerInMatch, PlayerSelection,
        PlayerSessionStats, StartMatchRequest, StartStagedMatchRequest, SubmitResultRequest,
        SuggestedMatch, UpdateCourtsRequest,
    },
    error::StorageError,
    models::{
        CourtRef, GameMatch, MatchAssignment, MatchOutcome, MatchStatus, Team, DEFAULT_BENCH_SLOT,
    },
    StoreOps,
};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::features::live;
use crate::features::roster::services::owned_session;
use crate::state::AppState;

/// The configured spelling of a real-court identifier, or `None` when the
/// identifier is not a configured court.
fn canonical_court(identifier: &str, configured: &[String]) -> Option<String> {
    configured
        .iter()
        .find(|c| c.eq_ignore_ascii_case(identifier))
        .cloned()
}

fn collect_roster(
    team_a: &[PlayerSelection],
    team_b: &[PlayerSelection],
) -> storage::Result<Vec<(Uuid, Team)>> {
    let mut seen = HashSet::new();
    let mut roster = Vec::with_capacity(team_a.len() + team_b.len());

    for (selections, team) in [(team_a, Team::A), (team_b, Team::B)] {
        for selection in selections {
            if !seen.insert(selection.participant_id) {
                return Err(StorageError::validation(
                    "A player cannot appear twice in one match",
                ));
            }
            roster.push((selection.participant_id, team));
        }
    }

    Ok(roster)
}

/// Every selected participant must belong to the session and must not sit
/// in another staged or playing match.
async fn check_roster_available(
    tx: &mut dyn StoreOps,
    session_id: Uuid,
    roster: &[(Uuid, Team)],
    exclude_match: Option<Uuid>,
) -> storage::Result<()> {
    let busy = tx
        .participants_in_open_matches(session_id, exclude_match)
        .await?;

    for (participant_id, _) in roster {
        let participant = tx
            .find_participant(*participant_id)
            .await?
            .filter(|p| p.session_id == session_id)
            .ok_or(StorageError::NotFound)?;
        if busy.contains(participant_id) {
            return Err(StorageError::conflict(format!(
                "{} is already in another match",
                participant.profile.display_name()
            )));
        }
    }

    Ok(())
}

async fn insert_roster(
    tx: &mut dyn StoreOps,
    match_id: Uuid,
    roster: &[(Uuid, Team)],
) -> storage::Result<()> {
    for (participant_id, team) in roster {
        tx.insert_assignment(&MatchAssignment {
            assignment_id: Uuid::new_v4(),
            match_id,
            participant_id: *participant_id,
            team: *team,
            result: None,
            notes: None,
        })
        .await?;
    }
    Ok(())
}

/// The session a match belongs to, read outside the command lock so the
/// lock can be taken before the real transaction starts.
async fn session_of_match(state: &AppState, match_id: Uuid) -> ApiResult<Uuid> {
    let mut tx = state.begin().await?;
    let game_match = tx
        .find_match(match_id)
        .await?
        .ok_or(StorageError::NotFound)?;
    Ok(game_match.session_id)
}

/// Stage a pairing on a court or bench slot. Staging onto a slot that
/// already holds a staged match replaces that match's roster wholesale;
/// staging an empty roster removes it.
pub async fn create_staged_match(
    state: &AppState,
    caller_id: Uuid,
    session_id: Uuid,
    request: &CreateStagedMatchRequest,
) -> ApiResult<Option<MatchView>> {
    let lock = state.session_lock(session_id);
    let _guard = lock.lock().await;

    let mut tx = state.begin().await?;

    let session = owned_session(tx.as_mut(), session_id, caller_id).await?;
    let configured = session.court_identifiers();

    let slot = match request.court_identifier.as_deref() {
        None => DEFAULT_BENCH_SLOT.to_string(),
        Some(id) => canonical_court(id, &configured).unwrap_or_else(|| id.to_string()),
    };

    let existing = tx.staged_match_on_slot(session_id, &slot).await?;
    let roster = collect_roster(&request.team_a, &request.team_b)?;

    if roster.is_empty() {
        if let Some(stale) = existing {
            tx.delete_match(stale.match_id).await?;
            tx.commit().await?;
            live::services::broadcast_after_commit(state, session_id);
        }
        return Ok(None);
    }

    let game_match = match existing {
        Some(found) => {
            check_roster_available(tx.as_mut(), session_id, &roster, Some(found.match_id)).await?;
            tx.delete_assignments_for_match(found.match_id).await?;
            found
        }
        None => {
            check_roster_available(tx.as_mut(), session_id, &roster, None).await?;
            let created = GameMatch {
                match_id: Uuid::new_v4(),
                session_id,
                court: Some(slot),
                status: MatchStatus::Staged,
                started_at: None,
                ended_at: None,
                created_at: Utc::now(),
            };
            tx.insert_match(&created).await?;
            created
        }
    };
    insert_roster(tx.as_mut(), game_match.match_id, &roster).await?;

    let view = live::services::match_view(tx.as_mut(), &game_match).await?;
    tx.commit().await?;
    live::services::broadcast_after_commit(state, session_id);

    Ok(Some(view))
}

/// Start a match directly on a real court.
pub async fn start_match(
    state: &AppState,
    caller_id: Uuid,
    session_id: Uuid,
    request: &StartMatchRequest,
) -> ApiResult<MatchView> {
    let lock = state.session_lock(session_id);
    let _guard = lock.lock().await;

    let mut tx = state.begin().await?;

    let session = owned_session(tx.as_mut(), session_id, caller_id).await?;
    let configured = session.court_identifiers();

    let court = canonical_court(&request.court_identifier, &configured).ok_or_else(|| {
        StorageError::validation(format!(
            "'{}' is not a configured court",
            request.court_identifier
        ))
    })?;

    if tx
        .playing_match_on_court(session_id, &court)
        .await?
        .is_some()
    {
        return Err(StorageError::conflict(format!("Court {court} is occupied")).into());
    }

    let roster = collect_roster(&request.team_a, &request.team_b)?;
    if request.team_a.is_empty() || request.team_b.is_empty() {
        return Err(StorageError::validation("Both teams need at least one player").into());
    }
    check_roster_available(tx.as_mut(), session_id, &roster, None).await?;

    let now = Utc::now();
    let game_match = GameMatch {
        match_id: Uuid::new_v4(),
        session_id,
        court: Some(court.clone()),
        status: MatchStatus::Playing,
        started_at: Some(now),
        ended_at: None,
        created_at: now,
    };
    tx.insert_match(&game_match).await?;
    insert_roster(tx.as_mut(), game_match.match_id, &roster).await?;

    let view = live::services::match_view(tx.as_mut(), &game_match).await?;
    tx.commit().await?;

    tracing::info!(%session_id, court, "Match started");
    live::services::broadcast_after_commit(state, session_id);

    Ok(view)
}

/// Promote a staged match to playing. The match's own identifier wins when
/// it names a real court; a bench-parked match needs the fallback.
pub async fn start_staged_match(
    state: &AppState,
    caller_id: Uuid,
    match_id: Uuid,
    request: &StartStagedMatchRequest,
) -> ApiResult<MatchView> {
    let session_id = session_of_match(state, match_id).await?;
    let lock = state.session_lock(session_id);
    let _guard = lock.lock().await;

    let mut tx = state.begin().await?;

    let session = owned_session(tx.as_mut(), session_id, caller_id).await?;
    let configured = session.court_identifiers();

    let mut game_match = tx
        .find_match(match_id)
        .await?
        .ok_or(StorageError::NotFound)?;
    if game_match.status != MatchStatus::Staged {
        return Err(StorageError::conflict("Match is not staged").into());
    }

    let court = match CourtRef::classify(game_match.court.as_deref(), &configured) {
        CourtRef::Real(id) => canonical_court(&id, &configured).unwrap_or(id),
        CourtRef::Bench(_) => request
            .court_identifier
            .as_deref()
            .and_then(|id| canonical_court(id, &configured))
            .ok_or_else(|| StorageError::conflict("No court available to start the match on"))?,
    };

    if tx
        .playing_match_on_court(session_id, &court)
        .await?
        .is_some()
    {
        return Err(StorageError::conflict(format!("Court {court} is occupied")).into());
    }

    let roster: Vec<(Uuid, Team)> = tx
        .assignments_for_match(match_id)
        .await?
        .iter()
        .map(|a| (a.participant_id, a.team))
        .collect();
    check_roster_available(tx.as_mut(), session_id, &roster, Some(match_id)).await?;

    game_match.court = Some(court.clone());
    game_match.status = MatchStatus::Playing;
    game_match.started_at = Some(Utc::now());
    tx.update_match(&game_match).await?;

    let view = live::services::match_view(tx.as_mut(), &game_match).await?;
    tx.commit().await?;

    tracing::info!(%session_id, court, "Staged match promoted to playing");
    live::services::broadcast_after_commit(state, session_id);

    Ok(view)
}

/// End a playing match, freeing its court.
pub async fn end_match(state: &AppState, caller_id: Uuid, match_id: Uuid) -> ApiResult<MatchView> {
    let session_id = session_of_match(state, match_id).await?;
    let lock = state.session_lock(session_id);
    let _guard = lock.lock().await;

    let mut tx = state.begin().await?;

    owned_session(tx.as_mut(), session_id, caller_id).await?;

    let mut game_match = tx
        .find_match(match_id)
        .await?
        .ok_or(StorageError::NotFound)?;
    if game_match.status != MatchStatus::Playing {
        return Err(StorageError::conflict("Match is not playing").into());
    }

    game_match.status = MatchStatus::Ended;
    game_match.ended_at = Some(Utc::now());
    tx.update_match(&game_match).await?;

    let view = live::services::match_view(tx.as_mut(), &game_match).await?;
    tx.commit().await?;

    tracing::info!(%session_id, %match_id, "Match ended");
    live::services::broadcast_after_commit(state, session_id);

    Ok(view)
}

/// A player records the outcome of their own assignment. Does not end the
/// match and does not touch anyone else's record.
pub async fn submit_result(
    state: &AppState,
    caller_id: Uuid,
    match_id: Uuid,
    request: &SubmitResultRequest,
) -> ApiResult<()> {
    let mut tx = state.begin().await?;

    tx.find_match(match_id)
        .await?
        .ok_or(StorageError::NotFound)?;

    let mut own_assignment = None;
    for assignment in tx.assignments_for_match(match_id).await? {
        let Some(participant) = tx.find_participant(assignment.participant_id).await? else {
            continue;
        };
        if participant.profile.member_user_id() == Some(caller_id) {
            own_assignment = Some(assignment);
            break;
        }
    }
    let mut assignment = own_assignment.ok_or(StorageError::NotFound)?;

    assignment.result = Some(request.result);
    assignment.notes = request.notes.clone();
    tx.update_assignment(&assignment).await?;

    tx.commit().await?;

    Ok(())
}

/// Replace the session's configured real-court list. Matches playing on a
/// court that disappears keep running; the projection shows them on the
/// bench side until they end.
pub async fn update_courts(
    state: &AppState,
    caller_id: Uuid,
    session_id: Uuid,
    request: &UpdateCourtsRequest,
) -> ApiResult<Vec<String>> {
    let lock = state.session_lock(session_id);
    let _guard = lock.lock().await;

    let mut tx = state.begin().await?;

    let mut session = owned_session(tx.as_mut(), session_id, caller_id).await?;
    session.configured_courts = Some(request.court_identifiers.clone());
    session.number_of_courts = request.court_identifiers.len() as i32;
    session.updated_at = Some(Utc::now());
    tx.update_session(&session).await?;

    tx.commit().await?;
    live::services::broadcast_after_commit(state, session_id);

    Ok(session.court_identifiers())
}

/// Per-participant match history and derived statistics over ended matches.
pub async fn player_stats(
    state: &AppState,
    caller_id: Uuid,
    session_id: Uuid,
    participant_id: Uuid,
) -> ApiResult<PlayerSessionStats> {
    let mut tx = state.begin().await?;

    let session = tx
        .find_session(session_id)
        .await?
        .ok_or(StorageError::NotFound)?;
    let participant = tx
        .find_participant(participant_id)
        .await?
        .filter(|p| p.session_id == session_id)
        .ok_or(StorageError::NotFound)?;

    let is_self = participant.profile.member_user_id() == Some(caller_id);
    if !session.is_owned_by(caller_id) && !is_self {
        return Err(StorageError::Forbidden.into());
    }

    let mut history = Vec::new();
    let mut wins = 0;
    let mut losses = 0;
    let mut total_minutes = 0;
    let mut timed_games = 0;

    for game_match in tx.matches_for_participant(session_id, participant_id).await? {
        if game_match.status != MatchStatus::Ended {
            continue;
        }

        let mut own_result = None;
        let mut own_team = None;
        let mut teammates = Vec::new();
        let mut opponents = Vec::new();

        let assignments = tx.assignments_for_match(game_match.match_id).await?;
        for assignment in &assignments {
            if assignment.participant_id == participant_id {
                own_result = assignment.result;
                own_team = Some(assignment.team);
            }
        }
        for assignment in &assignments {
            if assignment.participant_id == participant_id {
                continue;
            }
            let Some(other) = tx.find_participant(assignment.participant_id).await? else {
                continue;
            };
            let player = PlayerInMatch::from_participant(&other);
            if Some(assignment.team) == own_team {
                teammates.push(player);
            } else {
                opponents.push(player);
            }
        }

        match own_result {
            Some(MatchOutcome::Win) => wins += 1,
            Some(MatchOutcome::Loss) => losses += 1,
            _ => {}
        }
        let duration = game_match.duration_minutes();
        if let Some(minutes) = duration {
            total_minutes += minutes;
            timed_games += 1;
        }

        history.push(MatchHistoryEntry {
            match_id: game_match.match_id,
            court_identifier: game_match.court.clone(),
            started_at: game_match.started_at,
            ended_at: game_match.ended_at,
            duration_minutes: duration,
            result: own_result,
            teammates,
            opponents,
        });
    }

    let total_games = history.len();
    let average_minutes = if timed_games > 0 {
        total_minutes / timed_games
    } else {
        0
    };

    Ok(PlayerSessionStats {
        participant_id,
        display_name: participant.profile.display_name().to_string(),
        total_games,
        wins,
        losses,
        total_minutes,
        average_minutes,
        history,
    })
}

/// Propose the next pairing from the waiting pool: the four longest-waiting
/// players, first two against the next two. Empty when fewer than four are
/// waiting. Skill-balanced pairing is deliberately not offered.
pub async fn suggest_match(
    state: &AppState,
    caller_id: Uuid,
    session_id: Uuid,
) -> ApiResult<Vec<SuggestedMatch>> {
    let mut tx = state.begin().await?;
    owned_session(tx.as_mut(), session_id, caller_id).await?;

    let waiting = live::services::waiting_pool(tx.as_mut(), session_id).await?;
    if waiting.len() < 4 {
        return Ok(Vec::new());
    }

    let mut picks = waiting.into_iter();
    let team_a: Vec<_> = picks.by_ref().take(2).collect();
    let team_b: Vec<_> = picks.take(2).collect();
    Ok(vec![SuggestedMatch {
        team_a,
        team_b,
        reason: "The four longest-waiting players".to_string(),
    }])
}
