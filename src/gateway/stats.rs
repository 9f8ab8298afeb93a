//! Aggregate statistics broadcasting.

use crate::AppState;

use super::events::ServerEvent;
use super::fanout::Target;

/// Recount totals from the stores and broadcast a fresh snapshot to every
/// live connection. Triggered once per connect, disconnect, and successful
/// persist; the snapshot is never cached across events.
pub async fn recompute_and_broadcast(state: &AppState) {
    let total_messages = match state.messages.count_all().await {
        Ok(count) => count,
        Err(err) => {
            tracing::error!(%err, "failed to count messages for stats");
            return;
        }
    };
    let total_users = match state.identities.count_all().await {
        Ok(count) => count,
        Err(err) => {
            tracing::error!(%err, "failed to count identities for stats");
            return;
        }
    };

    // Connections may come and go while the store calls are in flight, so
    // the online count is read only after they resolve.
    let online_count = state.presence.online_count();

    state.broadcast.dispatch(
        Target::All,
        ServerEvent::Stats {
            total_messages,
            total_users,
            online_count,
        },
    );
}
