//! Persistent-store collaborators consumed by the gateway.
//!
//! The gateway owns no durable state of its own; accounts and messages live
//! behind these traits. Registration, profile CRUD, and schema management
//! happen elsewhere.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role, carried in credentials and on the identity profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// A registered account, resolved once at handshake and cached on the
/// connection for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub display_name: String,
    pub role: Role,
}

/// A persisted message. `id` and `created_at` are assigned by the store,
/// never accepted from the caller.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: i64,
    pub content: String,
    pub sender_id: i64,
    /// `None` for public (broadcast) messages.
    pub recipient_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Error surfaced by a store collaborator.
#[derive(Debug)]
pub enum StoreError {
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Lookup/count operations over registered accounts.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn lookup_by_id(&self, id: i64) -> Result<Option<Identity>, StoreError>;
    async fn count_all(&self) -> Result<i64, StoreError>;
}

/// Create/lookup/count operations over persisted messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message. The returned record carries the authoritative id
    /// and creation timestamp.
    async fn create(
        &self,
        content: &str,
        sender_id: i64,
        recipient_id: Option<i64>,
    ) -> Result<StoredMessage, StoreError>;

    /// The most recent public messages, newest first.
    async fn find_recent_public(&self, limit: usize) -> Result<Vec<StoredMessage>, StoreError>;

    async fn count_all(&self) -> Result<i64, StoreError>;
}
