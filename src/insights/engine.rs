//! Health insight engine
//!
//! Tries the remote collaborator first (bounded by a timeout) and falls back
//! to local heuristics on any failure. Each refresh is explicit; the cached
//! snapshot is never recomputed behind the caller's back.

use super::extractor::extract;
use super::remote::InsightCollaborator;
use super::synthesizer::{distinct_count, filter_disclaimers, health_score, synthesize};
use super::types::{Extraction, HealthSnapshot, InsightSource};
use crate::config::InsightsConfig;
use crate::error::{Error, Result};
use crate::session::ChatSession;
use crate::storage::{RecordKey, RecordStore};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Symptom/medication timeline builder with a cached snapshot
pub struct InsightEngine {
    store: Arc<RecordStore>,
    collaborator: Option<Arc<dyn InsightCollaborator>>,
    config: InsightsConfig,
    in_flight: Mutex<()>,
}

impl InsightEngine {
    /// Create an engine; `collaborator` is optional
    pub fn new(
        store: Arc<RecordStore>,
        collaborator: Option<Arc<dyn InsightCollaborator>>,
        config: InsightsConfig,
    ) -> Self {
        Self {
            store,
            collaborator,
            config,
            in_flight: Mutex::new(()),
        }
    }

    /// Last cached snapshot, if any
    pub fn cached_snapshot(&self) -> Result<Option<HealthSnapshot>> {
        self.store.get(RecordKey::HealthSnapshot)
    }

    /// Recompute and cache the snapshot.
    ///
    /// Returns `None` without doing any work when another refresh is still
    /// running.
    pub async fn refresh(&self, chats: &[ChatSession]) -> Result<Option<HealthSnapshot>> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::debug!("Insight refresh already in flight");
            return Ok(None);
        };

        let (extraction, source) = match self.remote_extraction(chats).await {
            Some(extraction) => (extraction, InsightSource::Remote),
            None => (self.heuristic_extraction(chats), InsightSource::Heuristic),
        };

        let snapshot = HealthSnapshot {
            health_score: health_score(
                distinct_count(extraction.symptoms.iter().map(|s| s.name.as_str())),
                distinct_count(extraction.medications.iter().map(|m| m.name.as_str())),
            ),
            insights: filter_disclaimers(extraction.insights),
            symptoms: extraction.symptoms,
            medications: extraction.medications,
            lifestyle: extraction.lifestyle,
            source,
            generated_at: crate::session::types::truncate_millis(Utc::now()),
        };

        match self.store.set(RecordKey::HealthSnapshot, &snapshot) {
            Ok(()) => {}
            Err(Error::EncryptionUnavailable) => return Err(Error::EncryptionUnavailable),
            Err(e) => tracing::warn!("Failed to cache health snapshot: {}", e),
        }

        tracing::info!(
            source = %snapshot.source,
            symptoms = snapshot.symptoms.len(),
            medications = snapshot.medications.len(),
            score = snapshot.health_score,
            "Health snapshot refreshed"
        );
        Ok(Some(snapshot))
    }

    async fn remote_extraction(&self, chats: &[ChatSession]) -> Option<Extraction> {
        let collaborator = self.collaborator.as_ref()?;
        let timeout = Duration::from_millis(self.config.timeout_ms);

        match tokio::time::timeout(timeout, collaborator.extract(chats)).await {
            Ok(Ok(extraction)) => match check_remote(&extraction) {
                Ok(()) => Some(extraction),
                Err(e) => {
                    tracing::warn!("Rejected collaborator result, using heuristics: {}", e);
                    None
                }
            },
            Ok(Err(e)) => {
                tracing::warn!("Insight collaborator failed, using heuristics: {}", e);
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.timeout_ms,
                    "Insight collaborator timed out, using heuristics"
                );
                None
            }
        }
    }

    fn heuristic_extraction(&self, chats: &[ChatSession]) -> Extraction {
        let mut extraction = extract(chats);
        extraction.insights = synthesize(&extraction.symptoms, &extraction.medications, &self.config);
        extraction
    }
}

/// Remote insights must carry a finite confidence in `[0, 1]`
fn check_remote(extraction: &Extraction) -> Result<()> {
    match extraction
        .insights
        .iter()
        .find(|i| !(0.0..=1.0).contains(&i.confidence))
    {
        Some(insight) => Err(Error::Collaborator(format!(
            "Insight '{}' has confidence {} outside [0, 1]",
            insight.pattern, insight.confidence
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CryptoStore, EncryptionKey};
    use crate::insights::types::{HealthInsight, InsightCategory, MedicationEntry};
    use crate::session::Message;
    use crate::storage::MemoryBackend;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone};

    enum Behavior {
        Succeed,
        Fail,
        Hang,
        Slow(u64),
        Returns(Extraction),
    }

    struct MockCollaborator(Behavior);

    #[async_trait]
    impl InsightCollaborator for MockCollaborator {
        async fn extract(&self, _chats: &[ChatSession]) -> Result<Extraction> {
            match &self.0 {
                Behavior::Succeed => {}
                Behavior::Fail => return Err(Error::Collaborator("503".to_string())),
                Behavior::Hang => tokio::time::sleep(Duration::from_secs(60)).await,
                Behavior::Slow(ms) => tokio::time::sleep(Duration::from_millis(*ms)).await,
                Behavior::Returns(extraction) => return Ok(extraction.clone()),
            }
            Ok(Extraction {
                symptoms: Vec::new(),
                medications: vec![metformin("Metformin")],
                lifestyle: Default::default(),
                insights: vec![
                    insight("Regular medication", "Keep taking it with meals.", 0.9),
                    insight("General", "Consult a healthcare provider.", 0.5),
                ],
            })
        }
    }

    fn metformin(name: &str) -> MedicationEntry {
        MedicationEntry {
            name: name.to_string(),
            start_date: at(1),
            frequency: "twice daily".to_string(),
        }
    }

    fn insight(pattern: &str, recommendation: &str, confidence: f32) -> HealthInsight {
        HealthInsight {
            pattern: pattern.to_string(),
            recommendation: recommendation.to_string(),
            confidence,
            category: InsightCategory::Medication,
        }
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 8, 0, 0).unwrap()
    }

    fn chats() -> Vec<ChatSession> {
        let messages = (1..=3)
            .flat_map(|day| {
                [
                    Message::new("A severe headache again", true, at(day)),
                    Message::new("Sorry to hear that.", false, at(day)),
                ]
            })
            .collect();
        vec![ChatSession {
            id: "c1".to_string(),
            topic: "Headaches".to_string(),
            created_at: at(1),
            messages,
            pinned: false,
            rating: None,
        }]
    }

    fn engine(behavior: Option<Behavior>, timeout_ms: u64) -> InsightEngine {
        let store = Arc::new(RecordStore::new(
            CryptoStore::new(Arc::new(MemoryBackend::new()), Some(EncryptionKey::generate())),
            Arc::new(MemoryBackend::new()),
        ));
        let collaborator =
            behavior.map(|b| Arc::new(MockCollaborator(b)) as Arc<dyn InsightCollaborator>);
        let config = InsightsConfig {
            timeout_ms,
            ..Default::default()
        };
        InsightEngine::new(store, collaborator, config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_heuristic_without_collaborator() {
        let e = engine(None, 100);
        let snapshot = e.refresh(&chats()).await.unwrap().unwrap();

        assert_eq!(snapshot.source, InsightSource::Heuristic);
        assert_eq!(snapshot.symptoms.len(), 1);
        assert_eq!(snapshot.symptoms[0].severity, vec![8, 8, 8]);
        assert_eq!(snapshot.health_score, 95);
        assert_eq!(snapshot.insights.len(), 1);
        assert!(snapshot.insights[0].recommendation.contains("triggers"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_result_used_and_filtered() {
        let e = engine(Some(Behavior::Succeed), 1_000);
        let snapshot = e.refresh(&chats()).await.unwrap().unwrap();

        assert_eq!(snapshot.source, InsightSource::Remote);
        assert_eq!(snapshot.medications[0].frequency, "twice daily");
        assert_eq!(snapshot.health_score, 97);
        assert_eq!(snapshot.insights.len(), 1);
        assert_eq!(snapshot.insights[0].pattern, "Regular medication");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_falls_back() {
        let e = engine(Some(Behavior::Fail), 1_000);
        let snapshot = e.refresh(&chats()).await.unwrap().unwrap();
        assert_eq!(snapshot.source, InsightSource::Heuristic);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back() {
        let e = engine(Some(Behavior::Hang), 50);
        let snapshot = e.refresh(&chats()).await.unwrap().unwrap();
        assert_eq!(snapshot.source, InsightSource::Heuristic);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_cached_and_explicit() {
        let e = engine(None, 100);
        assert!(e.cached_snapshot().unwrap().is_none());

        let snapshot = e.refresh(&chats()).await.unwrap().unwrap();
        assert_eq!(e.cached_snapshot().unwrap(), Some(snapshot.clone()));

        // Reading the cache does not recompute it
        assert_eq!(e.cached_snapshot().unwrap(), Some(snapshot));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refresh_is_skipped() {
        let e = Arc::new(engine(Some(Behavior::Slow(200)), 5_000));
        let first = {
            let e = e.clone();
            tokio::spawn(async move { e.refresh(&chats()).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(e.refresh(&chats()).await.unwrap().is_none());
        assert!(first.await.unwrap().unwrap().is_some());

        // Guard is released afterwards
        assert!(e.refresh(&chats()).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_confidence_falls_back() {
        for confidence in [5.0, -0.1, f32::NAN, f32::INFINITY] {
            let payload = Extraction {
                medications: vec![metformin("Metformin")],
                insights: vec![insight("Adherence", "Take it daily.", confidence)],
                ..Default::default()
            };
            let e = engine(Some(Behavior::Returns(payload)), 1_000);
            let snapshot = e.refresh(&chats()).await.unwrap().unwrap();

            assert_eq!(snapshot.source, InsightSource::Heuristic);
            assert!(snapshot
                .insights
                .iter()
                .all(|i| (0.0..=1.0).contains(&i.confidence)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_score_counts_distinct_remote_names() {
        let payload = Extraction {
            medications: vec![metformin("Metformin"), metformin("metformin")],
            insights: vec![insight("Adherence", "Take it daily.", 1.0)],
            ..Default::default()
        };
        let e = engine(Some(Behavior::Returns(payload)), 1_000);
        let snapshot = e.refresh(&chats()).await.unwrap().unwrap();

        assert_eq!(snapshot.source, InsightSource::Remote);
        assert_eq!(snapshot.health_score, 97);
    }
}
