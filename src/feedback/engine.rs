//! Feedback aggregation engine
//!
//! Keeps the capped feedback log and the profile derived from it. Every new
//! feedback event rebuilds the profile from scratch before returning.

use super::profile::{adaptive_prompt, build_profile};
use super::types::{FeedbackRecord, UserProfile};
use crate::config::FeedbackConfig;
use crate::error::{Error, Result};
use crate::storage::{RecordKey, RecordStore};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

struct FeedbackState {
    records: Vec<FeedbackRecord>,
    profile: UserProfile,
}

/// Personalization engine fed by like/dislike feedback
pub struct FeedbackProfileEngine {
    store: Arc<RecordStore>,
    config: FeedbackConfig,
    state: RwLock<FeedbackState>,
}

impl FeedbackProfileEngine {
    /// Load the feedback log and derive the current profile
    pub fn load(store: Arc<RecordStore>, config: FeedbackConfig) -> Result<Self> {
        // Without a key the log starts empty; the first write reports it
        let mut records: Vec<FeedbackRecord> = match store.get(RecordKey::FeedbackLog) {
            Ok(records) => records.unwrap_or_default(),
            Err(Error::EncryptionUnavailable) => Vec::new(),
            Err(e) => return Err(e),
        };
        truncate_to_recent(&mut records, config.max_records);
        let profile = build_profile(&records, &config);

        Ok(Self {
            store,
            config,
            state: RwLock::new(FeedbackState { records, profile }),
        })
    }

    /// Record a like/dislike and return the rebuilt profile
    pub async fn record_feedback(
        &self,
        message_id: &str,
        content: &str,
        liked: bool,
    ) -> Result<UserProfile> {
        let mut state = self.state.write().await;

        let mut records = state.records.clone();
        records.push(FeedbackRecord {
            message_id: message_id.to_string(),
            content: content.to_string(),
            liked,
            timestamp: crate::session::types::truncate_millis(Utc::now()),
        });
        truncate_to_recent(&mut records, self.config.max_records);
        self.persist(RecordKey::FeedbackLog, &records)?;

        let profile = build_profile(&records, &self.config);
        self.persist(RecordKey::UserProfile, &profile)?;
        state.records = records;
        state.profile = profile;

        tracing::debug!(
            feedback_count = state.records.len(),
            style = %state.profile.preferred_style,
            "Rebuilt user profile"
        );
        Ok(state.profile.clone())
    }

    /// Current profile
    pub async fn profile(&self) -> UserProfile {
        self.state.read().await.profile.clone()
    }

    /// Number of feedback records kept
    pub async fn feedback_count(&self) -> usize {
        self.state.read().await.records.len()
    }

    /// Feedback records, oldest first
    pub async fn records(&self) -> Vec<FeedbackRecord> {
        self.state.read().await.records.clone()
    }

    /// System prompt adapted to the profile (unchanged during cold start)
    pub async fn build_adaptive_prompt(&self, base_prompt: &str) -> String {
        let state = self.state.read().await;
        adaptive_prompt(base_prompt, &state.profile, state.records.len(), &self.config)
    }

    /// Forget all feedback
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.records.clear();
        state.profile = UserProfile::default();
        self.store.remove(RecordKey::FeedbackLog)?;
        self.store.remove(RecordKey::UserProfile)
    }

    fn persist<T: serde::Serialize>(&self, key: RecordKey, value: &T) -> Result<()> {
        match self.store.set(key, value) {
            Ok(()) => Ok(()),
            Err(Error::EncryptionUnavailable) => Err(Error::EncryptionUnavailable),
            Err(e) => {
                tracing::warn!(key = %key, "Dropping feedback write: {}", e);
                Ok(())
            }
        }
    }
}

fn truncate_to_recent(records: &mut Vec<FeedbackRecord>, max: usize) {
    if records.len() > max {
        let excess = records.len() - max;
        records.drain(..excess);
    }
}
