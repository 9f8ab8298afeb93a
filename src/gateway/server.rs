//! WebSocket upgrade handling and the per-connection event loop.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use crate::auth;
use crate::store::Identity;
use crate::AppState;

use super::connection::Connection;
use super::events::{ClientEvent, ServerEvent};
use super::fanout::{Envelope, Target};
use super::history;
use super::router as message_router;
use super::stats;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/gateway", get(ws_upgrade))
        .route("/health", get(health))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

/// Authenticate before upgrading. A refused handshake never enters the
/// active pool, so pre-auth client events are structurally unreachable.
async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let credential = auth::extract_credential(params.get("token").map(String::as_str), &headers);
    match auth::authenticate(&state, credential).await {
        Ok(identity) => ws.on_upgrade(move |socket| handle_connection(socket, state, identity)),
        Err(err) => {
            tracing::debug!(code = err.code(), "handshake refused");
            err.into_response()
        }
    }
}

async fn handle_connection(socket: WebSocket, state: AppState, identity: Identity) {
    let conn = Connection::new(identity);
    let (mut ws_tx, ws_rx) = socket.split();

    // Subscribe before our own join broadcast so this connection sees it too.
    let broadcast_rx = state.broadcast.subscribe();

    let online_count = state.presence.join(conn.identity.id, conn.id);

    tracing::info!(
        connection_id = %conn.id,
        identity_id = conn.identity.id,
        online_count,
        "gateway connection established"
    );

    // Backlog replay goes to this connection only, before any broadcasts.
    match history::backlog(&state).await {
        Ok(messages) => {
            if send_event(&mut ws_tx, &ServerEvent::HistoryReplay { messages })
                .await
                .is_err()
            {
                teardown(&state, &conn).await;
                return;
            }
        }
        Err(err) => {
            tracing::error!(%err, connection_id = %conn.id, "history replay failed");
        }
    }

    // Other connections may have joined or left during the backlog fetch;
    // announce with the current count, not the one captured at join.
    state.broadcast.dispatch(
        Target::All,
        ServerEvent::PeerJoined {
            identity_id: conn.identity.id,
            display_name: conn.identity.display_name.clone(),
            online_count: state.presence.online_count(),
        },
    );
    stats::recompute_and_broadcast(&state).await;

    run_connection(&state, &conn, ws_tx, ws_rx, broadcast_rx).await;

    teardown(&state, &conn).await;
}

/// Main loop: read client events, forward targeted broadcasts.
async fn run_connection(
    state: &AppState,
    conn: &Connection,
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut ws_rx: SplitStream<WebSocket>,
    mut broadcast_rx: broadcast::Receiver<Arc<Envelope>>,
) {
    loop {
        tokio::select! {
            // Client sends us an event.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let event: ClientEvent = match serde_json::from_str(&text) {
                            Ok(event) => event,
                            Err(err) => {
                                // Malformed input must not take down the connection.
                                tracing::debug!(%err, connection_id = %conn.id, "ignoring unparseable client event");
                                continue;
                            }
                        };
                        match event {
                            ClientEvent::SubmitPublic { content } => {
                                message_router::submit_public(state, conn, &content).await;
                            }
                            ClientEvent::SubmitPrivate { recipient_id, content } => {
                                message_router::submit_private(state, conn, recipient_id, &content).await;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(%err, connection_id = %conn.id, "ws read error");
                        break;
                    }
                    _ => continue,
                }
            }

            // Event from the fanout hub.
            result = broadcast_rx.recv() => {
                match result {
                    Ok(envelope) => {
                        if !envelope.target.includes(conn.id) {
                            continue;
                        }
                        if send_event(&mut ws_tx, &envelope.event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            connection_id = %conn.id,
                            skipped,
                            "connection lagged behind broadcast"
                        );
                        // Keep going; the missed events are simply dropped.
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

/// Deregister the connection and tell everyone left behind.
async fn teardown(state: &AppState, conn: &Connection) {
    let online_count = state.presence.leave(conn.identity.id, conn.id);

    state.broadcast.dispatch(
        Target::All,
        ServerEvent::PeerLeft {
            identity_id: conn.identity.id,
            display_name: conn.identity.display_name.clone(),
            online_count,
        },
    );
    stats::recompute_and_broadcast(state).await;

    tracing::info!(
        connection_id = %conn.id,
        identity_id = conn.identity.id,
        online_count,
        "gateway connection closed"
    );
}

async fn send_event(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).unwrap();
    ws_tx.send(Message::Text(json.into())).await
}
