//! Vault handle
//!
//! `CareVault` builds every component once over a shared record store and
//! hands out references. Nothing in the crate is a global.

use crate::config::CareVaultConfig;
use crate::crypto::{CryptoStore, EncryptionKey};
use crate::error::Result;
use crate::export::render_report;
use crate::feedback::FeedbackProfileEngine;
use crate::history::MedicineHistory;
use crate::insights::{HealthSnapshot, HttpInsightCollaborator, InsightCollaborator, InsightEngine};
use crate::session::{EphemeralSessionPointer, SessionRepository};
use crate::storage::{
    CapacityMonitor, CapacityReport, FileBackend, KvBackend, MemoryBackend, RecordStore,
};
use chrono::Utc;
use std::sync::Arc;

/// Local-first encrypted session and insight store
pub struct CareVault {
    config: CareVaultConfig,
    records: Arc<RecordStore>,
    sessions: SessionRepository,
    pointer: EphemeralSessionPointer,
    history: MedicineHistory,
    feedback: FeedbackProfileEngine,
    insights: InsightEngine,
    capacity: CapacityMonitor,
}

impl CareVault {
    /// Open the on-disk vault described by `config`.
    ///
    /// A missing key is not an error here; durable operations fail with
    /// `EncryptionUnavailable` on first use instead.
    pub fn open(config: CareVaultConfig) -> Result<Self> {
        let key = config.storage.resolve_key()?;
        if key.is_none() {
            tracing::warn!(
                key_file = %config.storage.key_file.display(),
                "No encryption key configured; durable storage is unavailable"
            );
        }

        let durable = Arc::new(FileBackend::open(
            &config.storage.data_dir,
            Some(config.storage.quota_bytes),
        )?);
        tracing::debug!(data_dir = %durable.dir().display(), "Opened durable store");
        Self::with_backends(config, durable, Arc::new(MemoryBackend::new()), key)
    }

    /// Build a vault over explicit backends
    pub fn with_backends(
        config: CareVaultConfig,
        durable: Arc<dyn KvBackend>,
        volatile: Arc<dyn KvBackend>,
        key: Option<EncryptionKey>,
    ) -> Result<Self> {
        let records = Arc::new(RecordStore::new(CryptoStore::new(durable, key), volatile));

        let collaborator = config.insights.endpoint.as_ref().map(|endpoint| {
            tracing::debug!(endpoint = %endpoint, "Using remote insight collaborator");
            Arc::new(HttpInsightCollaborator::new(endpoint.clone())) as Arc<dyn InsightCollaborator>
        });

        let sessions = SessionRepository::new(records.clone(), config.sessions.clone());
        let pointer = EphemeralSessionPointer::new(records.clone());
        let history = MedicineHistory::new(records.clone(), &config.history);
        let feedback = FeedbackProfileEngine::load(records.clone(), config.feedback.clone())?;
        let insights = InsightEngine::new(records.clone(), collaborator, config.insights.clone());
        let capacity = CapacityMonitor::new(&config.storage);

        Ok(Self {
            config,
            records,
            sessions,
            pointer,
            history,
            feedback,
            insights,
            capacity,
        })
    }

    pub fn config(&self) -> &CareVaultConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRepository {
        &self.sessions
    }

    pub fn pointer(&self) -> &EphemeralSessionPointer {
        &self.pointer
    }

    pub fn history(&self) -> &MedicineHistory {
        &self.history
    }

    pub fn feedback(&self) -> &FeedbackProfileEngine {
        &self.feedback
    }

    pub fn insights(&self) -> &InsightEngine {
        &self.insights
    }

    /// Recompute the health snapshot from every saved session
    pub async fn refresh_insights(&self) -> Result<Option<HealthSnapshot>> {
        let chats = self.sessions.get_all_chats().await?;
        self.insights.refresh(&chats).await
    }

    /// Current durable store usage
    pub fn capacity_report(&self) -> Result<CapacityReport> {
        self.capacity.report(self.records.durable())
    }

    /// Markdown report over sessions (display order) and the cached snapshot
    pub async fn export_report(&self) -> Result<String> {
        let sessions = self.sessions.sorted_for_display().await?;
        let snapshot = self.insights.cached_snapshot()?;
        Ok(render_report(&sessions, snapshot.as_ref(), Utc::now()))
    }

    /// Write every pending coalesced change now
    pub async fn flush(&self) {
        let sessions = self.sessions.flush().await;
        let history = self.history.flush().await;
        tracing::debug!(sessions, history, "Flushed pending writes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::insights::InsightSource;
    use crate::session::Message;
    use crate::storage::CapacityStatus;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> CareVaultConfig {
        let mut config = CareVaultConfig::default();
        config.storage.data_dir = dir.path().join("store");
        config.storage.key_file = dir.path().join("vault.key");
        config.sessions.save_debounce_ms = 20;
        config.history.save_debounce_ms = 20;
        config
    }

    fn open_with_key(dir: &TempDir) -> CareVault {
        let config = config(dir);
        let durable = Arc::new(FileBackend::open(&config.storage.data_dir, None).unwrap());
        CareVault::with_backends(
            config,
            durable,
            Arc::new(MemoryBackend::new()),
            Some(EncryptionKey::from_bytes([7u8; 32])),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_sessions_persist_across_reopen() {
        let dir = TempDir::new().unwrap();
        let id = {
            let vault = open_with_key(&dir);
            let id = vault
                .sessions()
                .save_chat(
                    "New Chat",
                    vec![
                        Message::user("I have a headache and feel dizzy"),
                        Message::assistant("Try resting in a dark room."),
                    ],
                    None,
                )
                .await
                .unwrap();
            vault.flush().await;
            id
        };

        let vault = open_with_key(&dir);
        let chat = vault.sessions().get_chat(&id).await.unwrap().unwrap();
        assert_eq!(chat.topic, "Have a headache and feel");
    }

    #[tokio::test]
    async fn test_missing_key_fails_on_first_use() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let durable = Arc::new(MemoryBackend::new());
        let vault =
            CareVault::with_backends(config, durable, Arc::new(MemoryBackend::new()), None).unwrap();

        let result = vault
            .sessions()
            .rename_chat("missing", "Renamed")
            .await;
        assert!(matches!(result, Err(Error::EncryptionUnavailable)));
    }

    #[tokio::test]
    async fn test_refresh_export_and_capacity() {
        let dir = TempDir::new().unwrap();
        let vault = open_with_key(&dir);
        vault
            .sessions()
            .save_chat(
                "Migraines",
                vec![
                    Message::user("Severe headache again, I take Sumatriptan"),
                    Message::assistant("Noted."),
                ],
                None,
            )
            .await
            .unwrap();

        let snapshot = vault.refresh_insights().await.unwrap().unwrap();
        assert_eq!(snapshot.source, InsightSource::Heuristic);
        assert_eq!(snapshot.health_score, 92);

        let report = vault.export_report().await.unwrap();
        assert!(report.contains("## Health Score: 92/100"));
        assert!(report.contains("### Migraines"));

        vault.flush().await;
        let capacity = vault.capacity_report().unwrap();
        assert!(capacity.used_bytes > 0);
        assert_eq!(capacity.status, CapacityStatus::Healthy);
    }
}
