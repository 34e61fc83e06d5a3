//! Connection handles and identities
//!
//! `ConnectionId` is the opaque key the registry uses to refer to a live
//! connection without owning it. `Identity` is the username bound to a
//! connection once it has authenticated.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique handle for one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next handle. Never returns the same value twice.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Authenticated username attached to a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn new(username: impl Into<String>) -> Self {
        Self(username.into())
    }

    pub fn username(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn connection_ids_are_unique() {
        let ids: HashSet<ConnectionId> = (0..1000).map(|_| ConnectionId::next()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn display_formats() {
        let id = ConnectionId::next();
        assert_eq!(id.to_string(), format!("conn-{}", id.as_u64()));
        assert_eq!(Identity::new("alice").to_string(), "alice");
    }
}
