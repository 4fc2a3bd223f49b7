use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
    Json,
};
use futures_util::{SinkExt, StreamExt};
use storage::{dto::live::LiveSessionState, error::StorageError, StoreOps};
use uuid::Uuid;

use crate::error::WebError;
use crate::middleware::auth::CallerId;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    get,
    path = "/api/sessions/{session_id}/live",
    params(
        ("session_id" = Uuid, Path, description = "Session id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current live state of the session", body = LiveSessionState),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not own the session"),
        (status = 404, description = "Session not found")
    ),
    tag = "live"
)]
pub async fn get_live_state(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(session_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let snapshot = services::get_live_state(&state, caller_id, session_id).await?;

    Ok(Json(snapshot).into_response())
}

/// WebSocket endpoint streaming live-state snapshots. The caller receives
/// the current snapshot on connect and a fresh one after every mutation.
pub async fn live_feed(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
    Path(session_id): Path<Uuid>,
) -> Result<Response, WebError> {
    // Authorize before upgrading; a bad session id never opens a socket.
    {
        let mut tx = state.begin().await?;
        let session = tx
            .find_session(session_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        if !session.is_owned_by(caller_id) {
            return Err(StorageError::Forbidden.into());
        }
    }

    Ok(ws.on_upgrade(move |socket| stream_snapshots(socket, state, session_id)))
}

async fn stream_snapshots(socket: WebSocket, state: AppState, session_id: Uuid) {
    let mut updates = state.hub().subscribe(session_id);
    let (mut sink, mut source) = socket.split();

    // Initial snapshot so the client does not wait for the next mutation.
    match services::get_snapshot(&state, session_id).await {
        Ok(Some(snapshot)) => {
            if send_snapshot(&mut sink, &snapshot).await.is_err() {
                state.hub().release(session_id);
                return;
            }
        }
        Ok(None) => {
            let _ = sink.close().await;
            state.hub().release(session_id);
            return;
        }
        Err(e) => {
            tracing::warn!(%session_id, "Initial live snapshot failed: {e}");
        }
    }

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(snapshot) => {
                    if send_snapshot(&mut sink, &snapshot).await.is_err() {
                        break;
                    }
                }
                // Lagged subscribers skip to the most recent snapshot.
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            incoming = source.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue,
            },
        }
    }

    state.hub().release(session_id);
}

async fn send_snapshot(
    sink: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    snapshot: &LiveSessionState,
) -> Result<(), axum::Error> {
    match serde_json::to_string(snapshot) {
        Ok(payload) => sink.send(Message::Text(payload)).await,
        Err(e) => {
            tracing::error!("Live snapshot serialization failed: {e}");
            Ok(())
        }
    }
}
