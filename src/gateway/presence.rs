//! In-memory presence tracking with multi-session support.
//!
//! Presence is per-identity, not per-connection: an identity is online while
//! it has at least one live connection, and its entry is removed entirely
//! once the last connection leaves, so no stale zero-entries linger.

use std::collections::HashSet;

use dashmap::DashMap;

use super::connection::ConnectionId;

/// DashMap-backed registry mapping identity id → live connection set.
pub struct PresenceRegistry {
    inner: DashMap<i64, HashSet<ConnectionId>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Register a connection coming online. Returns the number of distinct
    /// identities online after the join; multiple sessions of one identity
    /// count once.
    pub fn join(&self, identity_id: i64, connection_id: ConnectionId) -> usize {
        self.inner
            .entry(identity_id)
            .or_insert_with(HashSet::new)
            .insert(connection_id);
        self.inner.len()
    }

    /// Deregister a connection. The identity's entry is removed once its
    /// last connection leaves. Returns the updated distinct-online count.
    ///
    /// A leave without a matching join is an accounting violation; it is
    /// logged loudly and the registry is left untouched, never clamped.
    pub fn leave(&self, identity_id: i64, connection_id: ConnectionId) -> usize {
        let removed = match self.inner.get_mut(&identity_id) {
            Some(mut entry) => entry.remove(&connection_id),
            None => false,
        };

        if !removed {
            tracing::error!(
                identity_id,
                %connection_id,
                "presence underflow: leave without matching join"
            );
            return self.inner.len();
        }

        self.inner
            .remove_if(&identity_id, |_, connections| connections.is_empty());
        self.inner.len()
    }

    /// Live connections for an identity; empty when offline. The snapshot is
    /// only valid until the caller's next await.
    pub fn connections_of(&self, identity_id: i64) -> HashSet<ConnectionId> {
        self.inner
            .get(&identity_id)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    /// Number of distinct identities currently online.
    pub fn online_count(&self) -> usize {
        self.inner.len()
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_sessions_count_as_one_identity() {
        let registry = PresenceRegistry::new();
        let (c1, c2, c3) = (ConnectionId::next(), ConnectionId::next(), ConnectionId::next());

        assert_eq!(registry.join(1, c1), 1);
        assert_eq!(registry.join(1, c2), 1);
        assert_eq!(registry.join(2, c3), 2);
    }

    #[test]
    fn identity_stays_online_until_last_connection_leaves() {
        let registry = PresenceRegistry::new();
        let (c1, c2) = (ConnectionId::next(), ConnectionId::next());

        registry.join(1, c1);
        registry.join(1, c2);

        assert_eq!(registry.leave(1, c1), 1);
        assert_eq!(registry.connections_of(1), HashSet::from([c2]));

        assert_eq!(registry.leave(1, c2), 0);
        assert!(registry.connections_of(1).is_empty());
    }

    #[test]
    fn entry_is_removed_at_zero_not_kept_empty() {
        let registry = PresenceRegistry::new();
        let c1 = ConnectionId::next();

        registry.join(1, c1);
        registry.leave(1, c1);

        // The mapping shrinks; there is no empty entry left behind.
        assert_eq!(registry.online_count(), 0);
        assert_eq!(registry.join(2, ConnectionId::next()), 1);
    }

    #[test]
    fn leave_without_join_leaves_registry_untouched() {
        let registry = PresenceRegistry::new();
        let c1 = ConnectionId::next();

        registry.join(1, c1);

        assert_eq!(registry.leave(2, ConnectionId::next()), 1);
        assert_eq!(registry.leave(1, ConnectionId::next()), 1);
        assert_eq!(registry.connections_of(1), HashSet::from([c1]));
    }

    #[test]
    fn connections_of_is_empty_for_offline_identity() {
        let registry = PresenceRegistry::new();
        assert!(registry.connections_of(42).is_empty());
    }

    #[test]
    fn online_count_tracks_distinct_identities_through_churn() {
        let registry = PresenceRegistry::new();
        let ids: Vec<ConnectionId> = (0..6).map(|_| ConnectionId::next()).collect();

        registry.join(1, ids[0]);
        registry.join(1, ids[1]);
        registry.join(2, ids[2]);
        registry.join(3, ids[3]);
        assert_eq!(registry.online_count(), 3);

        registry.leave(2, ids[2]);
        assert_eq!(registry.online_count(), 2);

        registry.leave(1, ids[0]);
        assert_eq!(registry.online_count(), 2);

        registry.leave(1, ids[1]);
        registry.leave(3, ids[3]);
        assert_eq!(registry.online_count(), 0);
    }
}
