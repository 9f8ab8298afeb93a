//! Per-connection state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use crate::store::Identity;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique id for one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Mint the next connection id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

/// One live bidirectional session. The identity is resolved at handshake
/// and cached here for the connection's lifetime.
pub struct Connection {
    pub id: ConnectionId,
    pub identity: Identity,
    pub established_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(identity: Identity) -> Self {
        Self {
            id: ConnectionId::next(),
            identity,
            established_at: Utc::now(),
        }
    }
}
