//! Broadcast hub for dispatching events to live connections.
//!
//! One `tokio::sync::broadcast` channel carries every outbound event; each
//! connection's loop filters locally by delivery target. Unicast is a
//! target set on the envelope rather than a separate channel per peer.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::broadcast;

use super::connection::ConnectionId;
use super::events::ServerEvent;

/// Capacity of the broadcast channel. Receivers that fall behind skip
/// events (RecvError::Lagged).
const BROADCAST_CAPACITY: usize = 4096;

/// Which live connections an envelope is meant for.
#[derive(Debug, Clone)]
pub enum Target {
    /// Every live connection.
    All,
    /// Only the named connections.
    Connections(HashSet<ConnectionId>),
}

impl Target {
    pub fn includes(&self, connection_id: ConnectionId) -> bool {
        match self {
            Target::All => true,
            Target::Connections(set) => set.contains(&connection_id),
        }
    }
}

/// An event paired with its delivery target.
#[derive(Debug)]
pub struct Envelope {
    pub target: Target,
    pub event: ServerEvent,
}

/// The hub. Cloneable handle stored in AppState.
#[derive(Clone)]
pub struct GatewayBroadcast {
    sender: broadcast::Sender<Arc<Envelope>>,
}

impl GatewayBroadcast {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    /// Subscribe to the hub. Each connection loop calls this once, before
    /// any event it must not miss is dispatched.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Envelope>> {
        self.sender.subscribe()
    }

    /// Fire-and-forget dispatch. send() errors only when there are no
    /// receivers, which is fine here.
    pub fn dispatch(&self, target: Target, event: ServerEvent) {
        let _ = self.sender.send(Arc::new(Envelope { target, event }));
    }
}

impl Default for GatewayBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_all_includes_everyone() {
        let c1 = ConnectionId::next();
        assert!(Target::All.includes(c1));
    }

    #[test]
    fn target_set_includes_only_members() {
        let (c1, c2) = (ConnectionId::next(), ConnectionId::next());
        let target = Target::Connections(HashSet::from([c1]));
        assert!(target.includes(c1));
        assert!(!target.includes(c2));
    }

    #[tokio::test]
    async fn dispatch_reaches_subscribers() {
        let hub = GatewayBroadcast::new();
        let mut rx = hub.subscribe();

        hub.dispatch(
            Target::All,
            ServerEvent::Stats {
                total_messages: 1,
                total_users: 1,
                online_count: 1,
            },
        );

        let envelope = rx.recv().await.unwrap();
        assert!(matches!(envelope.target, Target::All));
        assert!(matches!(envelope.event, ServerEvent::Stats { .. }));
    }

    #[test]
    fn dispatch_without_subscribers_is_a_noop() {
        let hub = GatewayBroadcast::new();
        hub.dispatch(
            Target::All,
            ServerEvent::Stats {
                total_messages: 0,
                total_users: 0,
                online_count: 0,
            },
        );
    }
}
