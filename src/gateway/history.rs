//! Backlog replay for newly joined connections.

use std::collections::HashMap;

use crate::store::StoreError;
use crate::AppState;

use super::events::{OutboundMessage, Peer};

/// Fetch the most recent public messages and project them oldest-first for
/// one new connection. The store returns newest-first; private threads are
/// served on demand elsewhere, never through this push path.
pub async fn backlog(state: &AppState) -> Result<Vec<OutboundMessage>, StoreError> {
    let mut rows = state
        .messages
        .find_recent_public(state.config.history_limit)
        .await?;
    rows.reverse();

    // Senders repeat heavily in a backlog; resolve each one once.
    let mut peers: HashMap<i64, Option<Peer>> = HashMap::new();
    let mut messages = Vec::with_capacity(rows.len());

    for row in rows {
        let peer = match peers.get(&row.sender_id) {
            Some(cached) => cached.clone(),
            None => {
                let resolved = state
                    .identities
                    .lookup_by_id(row.sender_id)
                    .await?
                    .map(|identity| Peer::from(&identity));
                peers.insert(row.sender_id, resolved.clone());
                resolved
            }
        };

        let Some(sender) = peer else {
            tracing::debug!(
                sender_id = row.sender_id,
                message_id = row.id,
                "skipping backlog message from deleted identity"
            );
            continue;
        };

        messages.push(OutboundMessage {
            id: row.id,
            content: row.content,
            created_at: row.created_at,
            sender,
            recipient: None,
        });
    }

    Ok(messages)
}
