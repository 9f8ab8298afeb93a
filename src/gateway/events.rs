//! Wire-format events exchanged with clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Identity;

/// A message projection sent to clients, built from a persisted record as
/// soon as the store assigns id and timestamp. Never stored on its own.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub sender: Peer,
    /// `None` for public messages.
    pub recipient: Option<Peer>,
}

/// Identity reference embedded in outbound payloads.
#[derive(Debug, Clone, Serialize)]
pub struct Peer {
    pub id: i64,
    pub display_name: String,
}

impl From<&Identity> for Peer {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            display_name: identity.display_name.clone(),
        }
    }
}

/// Client → server events.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    SubmitPublic { content: String },
    SubmitPrivate { recipient_id: i64, content: String },
}

/// Server → client events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Backlog of recent public messages, oldest first. Unicast to a newly
    /// joined connection only.
    HistoryReplay { messages: Vec<OutboundMessage> },
    MessageDelivered(OutboundMessage),
    PeerJoined {
        identity_id: i64,
        display_name: String,
        online_count: usize,
    },
    PeerLeft {
        identity_id: i64,
        display_name: String,
        online_count: usize,
    },
    Stats {
        total_messages: i64,
        total_users: i64,
        online_count: usize,
    },
}
