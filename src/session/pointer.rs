//! One-shot "resume this session" handoff between views
//!
//! A list view records the session to open and raises a flag; the chat view
//! consumes the flag exactly once. Both live in the volatile store, so they
//! never outlive the process.

use crate::error::Result;
use crate::storage::{RecordKey, RecordStore};
use std::sync::Arc;

/// Active-session pointer with a read-once handoff flag
pub struct EphemeralSessionPointer {
    store: Arc<RecordStore>,
}

impl EphemeralSessionPointer {
    /// Create a pointer over the record store's volatile backend
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Set the active session id
    pub fn set_active(&self, session_id: &str) -> Result<()> {
        self.store.set(RecordKey::ActiveSessionId, session_id)
    }

    /// Current active session id, if any
    pub fn active(&self) -> Option<String> {
        self.store
            .get(RecordKey::ActiveSessionId)
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to read active session: {}", e);
                None
            })
    }

    /// Forget the active session id
    pub fn clear_active(&self) -> Result<()> {
        self.store.remove(RecordKey::ActiveSessionId)
    }

    /// Record a handoff from a list view: set the active id and raise the flag
    pub fn open_from_list(&self, session_id: &str) -> Result<()> {
        self.set_active(session_id)?;
        self.store.set(RecordKey::OpenedFromList, &true)
    }

    /// Read and clear the "opened from list" flag.
    ///
    /// Absence of the flag means no pending handoff and returns `false`.
    pub fn take_opened_from_list(&self) -> bool {
        let flag: Option<bool> = self.store.get(RecordKey::OpenedFromList).unwrap_or(None);
        if flag.is_some() {
            if let Err(e) = self.store.remove(RecordKey::OpenedFromList) {
                tracing::warn!("Failed to clear handoff flag: {}", e);
            }
        }
        flag.unwrap_or(false)
    }

    /// Consume a pending handoff, returning the session to resume
    pub fn take_handoff(&self) -> Option<String> {
        if self.take_opened_from_list() {
            self.active()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CryptoStore;
    use crate::storage::MemoryBackend;

    fn pointer() -> EphemeralSessionPointer {
        let store = Arc::new(RecordStore::new(
            // Volatile records never touch the durable store, not even its key
            CryptoStore::new(Arc::new(MemoryBackend::new()), None),
            Arc::new(MemoryBackend::new()),
        ));
        EphemeralSessionPointer::new(store)
    }

    #[test]
    fn test_no_handoff_by_default() {
        let p = pointer();
        assert!(!p.take_opened_from_list());
        assert!(p.take_handoff().is_none());
        assert!(p.active().is_none());
    }

    #[test]
    fn test_handoff_is_read_once() {
        let p = pointer();
        p.open_from_list("session-42").unwrap();

        assert_eq!(p.take_handoff().as_deref(), Some("session-42"));
        // Second read sees no pending handoff, but the active id remains
        assert!(p.take_handoff().is_none());
        assert_eq!(p.active().as_deref(), Some("session-42"));
    }

    #[test]
    fn test_set_active_without_flag() {
        let p = pointer();
        p.set_active("s1").unwrap();
        assert!(p.take_handoff().is_none());

        p.clear_active().unwrap();
        assert!(p.active().is_none());
    }
}
