//! Shared state shapes: the fetch state machine and in-flight guards.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::EngagementError;

/// `Idle -> Loading -> {Ready, Error}`, re-entering `Loading` on every fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    Idle,
    Loading,
    Ready(T),
    /// Failed load; carries the message to display.
    Error(String),
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            FetchState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchState::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Identifies one fetch: the entity it targets and its generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    key: String,
    generation: u64,
}

impl LoadTicket {
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// A fetched value tagged with the entity it belongs to.
///
/// Each [`FetchSlot::begin`] bumps the generation; settling with any
/// ticket but the newest is a no-op, so a late response for a superseded
/// request can never overwrite fresher state.
#[derive(Debug)]
pub struct FetchSlot<T> {
    key: Option<String>,
    generation: u64,
    state: FetchState<T>,
}

impl<T> Default for FetchSlot<T> {
    fn default() -> Self {
        Self {
            key: None,
            generation: 0,
            state: FetchState::Idle,
        }
    }
}

impl<T: Clone> FetchSlot<T> {
    pub fn begin(&mut self, key: &str) -> LoadTicket {
        self.generation += 1;
        self.key = Some(key.to_string());
        self.state = FetchState::Loading;
        LoadTicket {
            key: key.to_string(),
            generation: self.generation,
        }
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.generation && self.key.as_deref() == Some(ticket.key.as_str())
    }

    /// Commit a successful result. Returns `false` if the ticket is stale.
    pub fn settle_ok(&mut self, ticket: &LoadTicket, value: T) -> bool {
        if !self.is_current(ticket) {
            tracing::warn!(key = %ticket.key, "Discarding result of superseded fetch");
            return false;
        }
        self.state = FetchState::Ready(value);
        true
    }

    /// Commit a failure. Returns `false` if the ticket is stale.
    pub fn settle_err(&mut self, ticket: &LoadTicket, err: &EngagementError) -> bool {
        if !self.is_current(ticket) {
            tracing::warn!(key = %ticket.key, error = %err, "Discarding failure of superseded fetch");
            return false;
        }
        self.state = FetchState::Error(err.to_string());
        true
    }

    /// Entity the slot currently holds or is loading.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn state(&self) -> &FetchState<T> {
        &self.state
    }

    pub fn set_state(&mut self, state: FetchState<T>) {
        self.state = state;
    }

    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match &mut self.state {
            FetchState::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// Keys of operations that have been issued and not yet settled.
#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl PendingSet {
    /// Mark `key` as in flight, or fail with [`EngagementError::InFlight`]
    /// if it already is. The mark is released when the guard drops.
    pub fn try_acquire(&self, key: &str) -> Result<PendingGuard, EngagementError> {
        let mut keys = self.keys.lock().expect("Failed to acquire pending-set lock");
        if !keys.insert(key.to_string()) {
            tracing::warn!(key, "Ignoring repeat trigger while request is pending");
            return Err(EngagementError::InFlight);
        }
        Ok(PendingGuard {
            keys: Arc::clone(&self.keys),
            key: key.to_string(),
        })
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.keys
            .lock()
            .expect("Failed to acquire pending-set lock")
            .contains(key)
    }
}

/// Releases its key from the owning [`PendingSet`] on drop.
#[derive(Debug)]
pub struct PendingGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if let Ok(mut keys) = self.keys.lock() {
            keys.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn begin_enters_loading() {
        let mut slot: FetchSlot<u32> = FetchSlot::default();
        assert_eq!(slot.state(), &FetchState::Idle);
        let ticket = slot.begin("a");
        assert!(slot.state().is_loading());
        assert!(slot.settle_ok(&ticket, 7));
        assert_eq!(slot.state().ready(), Some(&7));
    }

    #[test]
    fn stale_ticket_cannot_commit() {
        let mut slot: FetchSlot<u32> = FetchSlot::default();
        let first = slot.begin("video-a");
        let second = slot.begin("video-b");

        assert!(slot.settle_ok(&second, 2));
        assert!(!slot.settle_ok(&first, 1));
        assert!(!slot.settle_err(&first, &EngagementError::NoActiveVideo));
        assert_eq!(slot.state().ready(), Some(&2));
        assert_eq!(slot.key(), Some("video-b"));
    }

    #[test]
    fn refetch_of_same_key_supersedes_older_ticket() {
        let mut slot: FetchSlot<u32> = FetchSlot::default();
        let first = slot.begin("video-a");
        let second = slot.begin("video-a");
        assert!(!slot.is_current(&first));
        assert!(slot.is_current(&second));
    }

    #[test]
    fn failure_settles_into_error() {
        let mut slot: FetchSlot<u32> = FetchSlot::default();
        let ticket = slot.begin("a");
        let err = EngagementError::Remote {
            status: Some(500),
            detail: "boom".to_string(),
        };
        assert!(slot.settle_err(&ticket, &err));
        assert!(slot.state().error().unwrap().contains("500"));
    }

    #[test]
    fn pending_guard_blocks_until_dropped() {
        let pending = PendingSet::default();
        let guard = pending.try_acquire("video-1").unwrap();
        assert!(pending.is_pending("video-1"));
        assert_matches!(pending.try_acquire("video-1"), Err(EngagementError::InFlight));
        assert!(pending.try_acquire("video-2").is_ok());

        drop(guard);
        assert!(!pending.is_pending("video-1"));
        assert!(pending.try_acquire("video-1").is_ok());
    }
}
