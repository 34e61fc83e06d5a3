//! Connection limiting middleware
//!
//! Caps the number of concurrent sessions with a semaphore. Each live session
//! holds one permit and returns it when it ends.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone)]
pub struct ConnectionLimiter {
    slots: Arc<Semaphore>,
    max_connections: usize,
}

impl ConnectionLimiter {
    pub fn new(max_connections: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        }
    }

    /// Takes a slot if one is free. Never waits.
    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.slots).try_acquire_owned().ok()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn in_use(&self) -> usize {
        self.max_connections - self.slots.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_and_releases() {
        let limiter = ConnectionLimiter::new(2);

        let first = limiter.try_acquire();
        let second = limiter.try_acquire();
        assert!(first.is_some());
        assert!(second.is_some());
        assert!(limiter.try_acquire().is_none());
        assert_eq!(limiter.in_use(), 2);

        drop(first);
        assert_eq!(limiter.in_use(), 1);
        assert!(limiter.try_acquire().is_some());
    }
}
