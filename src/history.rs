//! Medicine lookup history
//!
//! Most-recent-first list of looked-up medicines, unique by case-insensitive
//! name and capped in length. Writes are coalesced on their own timer,
//! independent of the session writer.

use crate::config::HistoryConfig;
use crate::error::Result;
use crate::storage::{CoalescedWriter, RecordKey, RecordStore, WriteSink};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// One remembered lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineHistoryItem {
    pub medicine: String,
    #[serde(with = "crate::session::types::iso_millis")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

/// Persisted medicine lookup history
pub struct MedicineHistory {
    store: Arc<RecordStore>,
    writer: CoalescedWriter<Vec<MedicineHistoryItem>>,
    max_items: usize,
}

impl MedicineHistory {
    /// Create a history over a record store
    pub fn new(store: Arc<RecordStore>, config: &HistoryConfig) -> Self {
        let sink_store = store.clone();
        let sink: WriteSink<Vec<MedicineHistoryItem>> =
            Arc::new(move |items| sink_store.set(RecordKey::MedicineHistory, items));

        Self {
            store,
            writer: CoalescedWriter::new(
                "medicine_history",
                Duration::from_millis(config.save_debounce_ms),
                sink,
            ),
            max_items: config.max_items,
        }
    }

    /// Remembered lookups, most recent first
    pub async fn list(&self) -> Result<Vec<MedicineHistoryItem>> {
        if let Some(pending) = self.writer.peek().await {
            return Ok(pending);
        }
        self.load()
    }

    fn load(&self) -> Result<Vec<MedicineHistoryItem>> {
        Ok(self
            .store
            .get(RecordKey::MedicineHistory)?
            .unwrap_or_default())
    }

    /// Record a lookup, moving an existing entry of the same name to the front
    pub async fn add(&self, medicine: &str, response: Option<String>) -> Result<()> {
        let medicine = medicine.trim();
        if medicine.is_empty() {
            return Ok(());
        }

        let item = MedicineHistoryItem {
            medicine: medicine.to_string(),
            timestamp: crate::session::types::truncate_millis(Utc::now()),
            response,
        };
        let max_items = self.max_items;

        self.writer
            .schedule_with(|pending| -> Result<Vec<MedicineHistoryItem>> {
                let items = match pending {
                    Some(items) => items,
                    None => self.load()?,
                };
                Ok(push_front(items, item, max_items))
            })
            .await
    }

    /// Forget one medicine (case-insensitive). Returns whether it was present.
    pub async fn remove(&self, medicine: &str) -> Result<bool> {
        self.writer
            .cancel_with(|pending| {
                let mut items = match pending {
                    Some(items) => items,
                    None => self.load()?,
                };
                let before = items.len();
                let name = normalize(medicine);
                items.retain(|i| normalize(&i.medicine) != name);
                let removed = items.len() != before;

                if let Err(e) = self.store.set(RecordKey::MedicineHistory, &items) {
                    tracing::warn!("Dropping medicine history write: {}", e);
                }
                Ok(removed)
            })
            .await
    }

    /// Forget every lookup
    pub async fn clear(&self) -> Result<()> {
        self.writer
            .cancel_with(|_| self.store.remove(RecordKey::MedicineHistory))
            .await
    }

    /// Write any pending coalesced state now
    pub async fn flush(&self) -> bool {
        self.writer.flush().await
    }
}

/// Insert `item` at the front, dropping same-name entries and trimming to `max`
fn push_front(
    mut items: Vec<MedicineHistoryItem>,
    item: MedicineHistoryItem,
    max: usize,
) -> Vec<MedicineHistoryItem> {
    let name = normalize(&item.medicine);
    items.retain(|i| normalize(&i.medicine) != name);
    items.insert(0, item);
    items.truncate(max);
    items
}

/// Key used to compare medicine names
fn normalize(medicine: &str) -> String {
    medicine.trim().to_lowercase()
}
