//! Logical record routing
//!
//! Callers address records by `RecordKey`; the store decides whether a record
//! lives in the encrypted durable backend or in the plain volatile backend
//! that only lasts for the current process.

use crate::crypto::CryptoStore;
use crate::error::Result;
use crate::storage::KvBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Physical backend a record is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Encrypted, survives restarts
    Durable,
    /// Unencrypted, per-process handoff state
    Volatile,
}

/// Logical record keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKey {
    ChatHistory,
    MedicineHistory,
    FeedbackLog,
    UserProfile,
    HealthSnapshot,
    ActiveSessionId,
    OpenedFromList,
}

impl RecordKey {
    /// Storage key string
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKey::ChatHistory => "chat_history",
            RecordKey::MedicineHistory => "medicine_history",
            RecordKey::FeedbackLog => "feedback_log",
            RecordKey::UserProfile => "user_profile",
            RecordKey::HealthSnapshot => "health_snapshot",
            RecordKey::ActiveSessionId => "active_session_id",
            RecordKey::OpenedFromList => "opened_from_list",
        }
    }

    /// Backend this record is routed to
    pub fn route(&self) -> Route {
        match self {
            RecordKey::ActiveSessionId | RecordKey::OpenedFromList => Route::Volatile,
            _ => Route::Durable,
        }
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing facade over the durable and volatile backends
pub struct RecordStore {
    durable: CryptoStore,
    volatile: Arc<dyn KvBackend>,
}

impl RecordStore {
    /// Create a record store from its two backends
    pub fn new(durable: CryptoStore, volatile: Arc<dyn KvBackend>) -> Self {
        Self { durable, volatile }
    }

    /// The encrypted durable store
    pub fn durable(&self) -> &CryptoStore {
        &self.durable
    }

    /// Read a record. Unreadable records are dropped and reported as absent.
    pub fn get<T: DeserializeOwned>(&self, key: RecordKey) -> Result<Option<T>> {
        match key.route() {
            Route::Durable => self.durable.get_item(key.as_str()),
            Route::Volatile => {
                let raw = match self.volatile.get(key.as_str()) {
                    Ok(Some(raw)) => raw,
                    Ok(None) => return Ok(None),
                    Err(e) => {
                        tracing::warn!(key = %key, "Failed to read volatile record: {}", e);
                        return Ok(None);
                    }
                };
                match serde_json::from_str(&raw) {
                    Ok(value) => Ok(Some(value)),
                    Err(e) => {
                        tracing::warn!(key = %key, "Discarding malformed volatile record: {}", e);
                        if let Err(e) = self.volatile.remove(key.as_str()) {
                            tracing::warn!(key = %key, "Failed to remove malformed volatile record: {}", e);
                        }
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Write a record
    pub fn set<T: Serialize + ?Sized>(&self, key: RecordKey, value: &T) -> Result<()> {
        match key.route() {
            Route::Durable => self.durable.set_item(key.as_str(), value),
            Route::Volatile => {
                let raw = serde_json::to_string(value)?;
                self.volatile.set(key.as_str(), &raw)
            }
        }
    }

    /// Delete a record
    pub fn remove(&self, key: RecordKey) -> Result<()> {
        match key.route() {
            Route::Durable => self.durable.remove_item(key.as_str()),
            Route::Volatile => self.volatile.remove(key.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::EncryptionKey;
    use crate::storage::MemoryBackend;

    fn stores() -> (Arc<MemoryBackend>, Arc<MemoryBackend>, RecordStore) {
        let durable = Arc::new(MemoryBackend::new());
        let volatile = Arc::new(MemoryBackend::new());
        let store = RecordStore::new(
            CryptoStore::new(durable.clone(), Some(EncryptionKey::generate())),
            volatile.clone(),
        );
        (durable, volatile, store)
    }

    #[test]
    fn test_routes() {
        assert_eq!(RecordKey::ChatHistory.route(), Route::Durable);
        assert_eq!(RecordKey::HealthSnapshot.route(), Route::Durable);
        assert_eq!(RecordKey::ActiveSessionId.route(), Route::Volatile);
        assert_eq!(RecordKey::OpenedFromList.route(), Route::Volatile);
    }

    #[test]
    fn test_durable_records_are_encrypted() {
        let (durable, volatile, store) = stores();
        store
            .set(RecordKey::MedicineHistory, &vec!["Ibuprofen"])
            .unwrap();

        let raw = durable.get("medicine_history").unwrap().unwrap();
        assert!(!raw.contains("Ibuprofen"));
        assert!(volatile.entries().unwrap().is_empty());

        let back: Vec<String> = store.get(RecordKey::MedicineHistory).unwrap().unwrap();
        assert_eq!(back, vec!["Ibuprofen"]);
    }

    #[test]
    fn test_volatile_records_are_plain() {
        let (durable, volatile, store) = stores();
        store.set(RecordKey::ActiveSessionId, "abc").unwrap();

        assert_eq!(
            volatile.get("active_session_id").unwrap().as_deref(),
            Some("\"abc\"")
        );
        assert!(durable.entries().unwrap().is_empty());

        store.remove(RecordKey::ActiveSessionId).unwrap();
        assert!(store
            .get::<String>(RecordKey::ActiveSessionId)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_malformed_volatile_record_is_dropped() {
        let (_, volatile, store) = stores();
        volatile.set("opened_from_list", "{not json").unwrap();

        assert!(store.get::<bool>(RecordKey::OpenedFromList).unwrap().is_none());
        assert!(volatile.get("opened_from_list").unwrap().is_none());
    }

    /// Volatile backend that holds one malformed value and refuses to delete
    struct StuckBackend;

    impl KvBackend for StuckBackend {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(Some("{not json".to_string()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Ok(())
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(crate::error::Error::Storage("read-only".to_string()))
        }
        fn clear(&self) -> Result<()> {
            Ok(())
        }
        fn entries(&self) -> Result<Vec<(String, String)>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_failed_cleanup_still_reads_as_absent() {
        let store = RecordStore::new(
            CryptoStore::new(Arc::new(MemoryBackend::new()), Some(EncryptionKey::generate())),
            Arc::new(StuckBackend),
        );
        assert!(store.get::<bool>(RecordKey::OpenedFromList).unwrap().is_none());
    }
}
