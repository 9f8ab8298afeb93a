//! Message validation, persistence, and fanout.

use crate::AppState;

use super::connection::Connection;
use super::events::{OutboundMessage, Peer, ServerEvent};
use super::fanout::Target;
use super::stats;

/// Handle a public submission: trim, persist, broadcast to every live
/// connection, then refresh stats. Blank content is dropped silently.
pub async fn submit_public(state: &AppState, conn: &Connection, content: &str) {
    let content = content.trim();
    if content.is_empty() {
        tracing::debug!(connection_id = %conn.id, "dropping blank public message");
        return;
    }

    let created = match state.messages.create(content, conn.identity.id, None).await {
        Ok(created) => created,
        Err(err) => {
            tracing::error!(%err, connection_id = %conn.id, "failed to persist public message");
            return;
        }
    };

    let message = OutboundMessage {
        id: created.id,
        content: created.content,
        created_at: created.created_at,
        sender: Peer::from(&conn.identity),
        recipient: None,
    };

    state
        .broadcast
        .dispatch(Target::All, ServerEvent::MessageDelivered(message));
    stats::recompute_and_broadcast(state).await;
}

/// Handle a private submission: persist, then deliver to the recipient's
/// live connections plus one echo to the sender. The target set is a
/// `HashSet`, so a self-addressed message reaches its single connection
/// exactly once.
pub async fn submit_private(state: &AppState, conn: &Connection, recipient_id: i64, content: &str) {
    let content = content.trim();
    if content.is_empty() {
        tracing::debug!(connection_id = %conn.id, "dropping blank private message");
        return;
    }

    let recipient = match state.identities.lookup_by_id(recipient_id).await {
        Ok(Some(identity)) => identity,
        Ok(None) => {
            tracing::debug!(
                connection_id = %conn.id,
                recipient_id,
                "dropping private message to unknown recipient"
            );
            return;
        }
        Err(err) => {
            tracing::error!(%err, connection_id = %conn.id, "recipient lookup failed");
            return;
        }
    };

    let created = match state
        .messages
        .create(content, conn.identity.id, Some(recipient_id))
        .await
    {
        Ok(created) => created,
        Err(err) => {
            tracing::error!(%err, connection_id = %conn.id, "failed to persist private message");
            return;
        }
    };

    // Presence may have changed while the store call was in flight; collect
    // the target set only now.
    let mut targets = state.presence.connections_of(recipient_id);
    targets.insert(conn.id);

    let message = OutboundMessage {
        id: created.id,
        content: created.content,
        created_at: created.created_at,
        sender: Peer::from(&conn.identity),
        recipient: Some(Peer::from(&recipient)),
    };

    state.broadcast.dispatch(
        Target::Connections(targets),
        ServerEvent::MessageDelivered(message),
    );
    stats::recompute_and_broadcast(state).await;
}
