//! In-memory store implementations.
//!
//! Back the binary and the tests; a database-backed implementation plugs in
//! behind the same traits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::{Identity, IdentityStore, MessageStore, StoreError, StoredMessage};

pub struct MemoryIdentityStore {
    identities: Mutex<HashMap<i64, Identity>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self {
            identities: Mutex::new(HashMap::new()),
        }
    }

    /// Seed an identity. Registration itself is not the gateway's job.
    pub fn insert(&self, identity: Identity) {
        self.identities.lock().insert(identity.id, identity);
    }
}

impl Default for MemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn lookup_by_id(&self, id: i64) -> Result<Option<Identity>, StoreError> {
        Ok(self.identities.lock().get(&id).cloned())
    }

    async fn count_all(&self) -> Result<i64, StoreError> {
        Ok(self.identities.lock().len() as i64)
    }
}

pub struct MemoryMessageStore {
    messages: Mutex<Vec<StoredMessage>>,
    next_id: AtomicI64,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(0),
        }
    }
}

impl Default for MemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn create(
        &self,
        content: &str,
        sender_id: i64,
        recipient_id: Option<i64>,
    ) -> Result<StoredMessage, StoreError> {
        let message = StoredMessage {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            content: content.to_string(),
            sender_id,
            recipient_id,
            created_at: Utc::now(),
        };
        self.messages.lock().push(message.clone());
        Ok(message)
    }

    async fn find_recent_public(&self, limit: usize) -> Result<Vec<StoredMessage>, StoreError> {
        let messages = self.messages.lock();
        Ok(messages
            .iter()
            .rev()
            .filter(|m| m.recipient_id.is_none())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_all(&self) -> Result<i64, StoreError> {
        Ok(self.messages.lock().len() as i64)
    }
}
