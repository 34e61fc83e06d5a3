//! Connection registry
//!
//! Tracks which connections are currently authenticated. The map lives behind
//! a single mutex owned by the registry, and every operation holds that lock
//! for its whole step.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tokio::sync::Mutex;

use crate::error::RegistryError;
use crate::registry::connection::{ConnectionId, Identity};

/// Registry of authenticated connections, keyed by connection handle.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, Identity>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `conn` as authenticated under `identity` and returns the new size.
    ///
    /// Registering the same connection twice is a protocol violation; the
    /// existing entry is kept and an error is returned.
    pub async fn register(
        &self,
        conn: ConnectionId,
        identity: Identity,
    ) -> Result<usize, RegistryError> {
        let mut connections = self.connections.lock().await;
        match connections.entry(conn) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyRegistered(conn)),
            Entry::Vacant(slot) => {
                slot.insert(identity);
                Ok(connections.len())
            }
        }
    }

    /// Removes `conn` if present. Unregistering an unknown connection is a no-op.
    pub async fn unregister(&self, conn: ConnectionId) -> Option<Identity> {
        self.connections.lock().await.remove(&conn)
    }

    pub async fn count(&self) -> usize {
        self.connections.lock().await.len()
    }

    pub async fn contains(&self, conn: ConnectionId) -> bool {
        self.connections.lock().await.contains_key(&conn)
    }

    pub async fn identity(&self, conn: ConnectionId) -> Option<Identity> {
        self.connections.lock().await.get(&conn).cloned()
    }

    /// Snapshot of connected usernames, sorted.
    pub async fn usernames(&self) -> Vec<String> {
        let connections = self.connections.lock().await;
        let mut names: Vec<String> = connections
            .values()
            .map(|identity| identity.username().to_string())
            .collect();
        names.sort();
        names
    }
}
