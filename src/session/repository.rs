//! Session repository
//!
//! The whole collection of sessions is one encrypted record. Appends from the
//! chat flow go through a coalesced writer (one physical write per quiet
//! window); discrete user actions (rename, pin, rate, delete) take over any
//! pending state and write synchronously so a read right after them observes
//! the change.
//!
//! ```text
//! save_chat ──► CoalescedWriter ──(quiet window)──► RecordStore ──► CryptoStore
//! rename/pin/rate/delete ──(cancel pending)───────► RecordStore
//! ```

use super::title::smart_title;
use super::types::{ChatSession, Message};
use crate::config::SessionsConfig;
use crate::error::{Error, Result};
use crate::storage::{CoalescedWriter, RecordKey, RecordStore, WriteSink};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Lowest and highest accepted session rating
pub const RATING_RANGE: (u8, u8) = (1, 5);

/// CRUD over the persisted session collection
pub struct SessionRepository {
    store: Arc<RecordStore>,
    writer: CoalescedWriter<Vec<ChatSession>>,
    config: SessionsConfig,
}

impl SessionRepository {
    /// Create a repository over a record store
    pub fn new(store: Arc<RecordStore>, config: SessionsConfig) -> Self {
        let sink_store = store.clone();
        let sink: WriteSink<Vec<ChatSession>> =
            Arc::new(move |chats| sink_store.set(RecordKey::ChatHistory, chats));
        let writer = CoalescedWriter::new(
            "chat_history",
            Duration::from_millis(config.save_debounce_ms),
            sink,
        );

        Self {
            store,
            writer,
            config,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// All sessions, in stored order, with duplicate ids removed.
    ///
    /// Reflects a pending coalesced write if there is one. Undecodable data
    /// yields an empty collection; only `EncryptionUnavailable` is an error.
    pub async fn get_all_chats(&self) -> Result<Vec<ChatSession>> {
        if let Some(pending) = self.writer.peek().await {
            return Ok(pending);
        }
        self.load_persisted()
    }

    /// A single session by id
    pub async fn get_chat(&self, id: &str) -> Result<Option<ChatSession>> {
        Ok(self.get_all_chats().await?.into_iter().find(|c| c.id == id))
    }

    /// Sessions in display order: pinned first, then most recent first
    pub async fn sorted_for_display(&self) -> Result<Vec<ChatSession>> {
        let mut chats = self.get_all_chats().await?;
        sort_for_display(&mut chats);
        Ok(chats)
    }

    fn load_persisted(&self) -> Result<Vec<ChatSession>> {
        let raw: Vec<serde_json::Value> = self.store.get(RecordKey::ChatHistory)?.unwrap_or_default();

        let chats = raw
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<ChatSession>(value) {
                Ok(chat) => Some(chat),
                Err(e) => {
                    tracing::warn!("Skipping malformed session record: {}", e);
                    None
                }
            })
            .collect();

        Ok(dedup_by_id(chats))
    }

    // =========================================================================
    // Coalesced save
    // =========================================================================

    /// Upsert a conversation and schedule a coalesced write.
    ///
    /// Returns the session id (`existing_id` or a freshly minted one). Nothing
    /// is written when `messages` is empty or no assistant reply exists yet;
    /// trailing user messages without a reply are left out of the persisted
    /// copy.
    pub async fn save_chat(
        &self,
        topic: &str,
        messages: Vec<Message>,
        existing_id: Option<&str>,
    ) -> Result<String> {
        let id = existing_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if messages.is_empty() {
            tracing::debug!(session_id = %id, "Skipping save of empty session");
            return Ok(id);
        }

        let answered = answered_prefix(&messages);
        if answered.is_empty() {
            tracing::debug!(session_id = %id, "No assistant reply yet, session not persisted");
            return Ok(id);
        }
        let answered = answered.to_vec();

        self.writer
            .schedule_with(|pending| -> Result<Vec<ChatSession>> {
                let mut chats = match pending {
                    Some(chats) => chats,
                    None => self.load_persisted()?,
                };
                let existing = chats.iter().find(|c| c.id == id);

                // A stored topic wins unless it is still the default
                let topic = match existing {
                    Some(e) if e.topic != self.config.default_topic => e.topic.clone(),
                    _ if topic != self.config.default_topic => topic.to_string(),
                    _ => smart_title(
                        &messages,
                        self.config.title_words,
                        &self.config.fallback_title,
                    ),
                };

                let session = ChatSession {
                    id: id.clone(),
                    topic,
                    created_at: existing.map(|e| e.created_at).unwrap_or_else(|| {
                        super::types::truncate_millis(Utc::now())
                    }),
                    messages: answered,
                    pinned: existing.map(|e| e.pinned).unwrap_or(false),
                    rating: existing.and_then(|e| e.rating),
                };

                match chats.iter().position(|c| c.id == id) {
                    Some(index) => chats[index] = session,
                    None => chats.push(session),
                }
                Ok(chats)
            })
            .await?;

        tracing::debug!(session_id = %id, "Session save scheduled");
        Ok(id)
    }

    /// Write any pending coalesced state now
    pub async fn flush(&self) -> bool {
        self.writer.flush().await
    }

    // =========================================================================
    // Discrete actions (synchronous read-modify-write)
    // =========================================================================

    /// Rename a session. Returns whether it exists.
    pub async fn rename_chat(&self, id: &str, topic: &str) -> Result<bool> {
        let topic = topic.trim().to_string();
        self.mutate(|chats| match chats.iter_mut().find(|c| c.id == id) {
            Some(chat) if !topic.is_empty() => {
                chat.topic = topic;
                true
            }
            Some(_) => false,
            None => false,
        })
        .await
    }

    /// Flip the pinned flag. Returns the new state, or `None` if absent.
    pub async fn toggle_pin(&self, id: &str) -> Result<Option<bool>> {
        self.mutate(|chats| {
            chats.iter_mut().find(|c| c.id == id).map(|chat| {
                chat.pinned = !chat.pinned;
                chat.pinned
            })
        })
        .await
    }

    /// Rate a session (clamped to 1–5). Returns whether it exists.
    pub async fn rate_chat(&self, id: &str, rating: u8) -> Result<bool> {
        let rating = rating.clamp(RATING_RANGE.0, RATING_RANGE.1);
        self.mutate(|chats| match chats.iter_mut().find(|c| c.id == id) {
            Some(chat) => {
                chat.rating = Some(rating);
                true
            }
            None => false,
        })
        .await
    }

    /// Delete a session. Returns whether it existed.
    pub async fn delete_chat(&self, id: &str) -> Result<bool> {
        self.mutate(|chats| {
            let before = chats.len();
            chats.retain(|c| c.id != id);
            chats.len() != before
        })
        .await
    }

    /// Delete every session, including any pending write
    pub async fn clear_all(&self) -> Result<()> {
        self.writer
            .cancel_with(|_| match self.store.remove(RecordKey::ChatHistory) {
                Ok(()) => Ok(()),
                Err(Error::EncryptionUnavailable) => Err(Error::EncryptionUnavailable),
                Err(e) => {
                    tracing::warn!("Failed to clear sessions: {}", e);
                    Ok(())
                }
            })
            .await
    }

    async fn mutate<R>(&self, f: impl FnOnce(&mut Vec<ChatSession>) -> R) -> Result<R> {
        self.writer
            .cancel_with(|pending| {
                let mut chats = match pending {
                    Some(chats) => chats,
                    None => self.load_persisted()?,
                };
                let out = f(&mut chats);

                match self.store.set(RecordKey::ChatHistory, &chats) {
                    Ok(()) => {}
                    Err(Error::EncryptionUnavailable) => return Err(Error::EncryptionUnavailable),
                    Err(e) => tracing::warn!("Dropping session write: {}", e),
                }
                Ok(out)
            })
            .await
    }
}

/// Keep the first occurrence of each id
pub fn dedup_by_id(chats: Vec<ChatSession>) -> Vec<ChatSession> {
    let mut seen = HashSet::new();
    let before = chats.len();
    let deduped: Vec<ChatSession> = chats
        .into_iter()
        .filter(|c| seen.insert(c.id.clone()))
        .collect();
    if deduped.len() != before {
        tracing::warn!(
            dropped = before - deduped.len(),
            "Removed duplicate session ids"
        );
    }
    deduped
}

/// Stable sort: pinned before unpinned, most recent activity first
pub fn sort_for_display(chats: &mut [ChatSession]) {
    chats.sort_by(|a, b| {
        b.pinned
            .cmp(&a.pinned)
            .then_with(|| b.last_activity().cmp(&a.last_activity()))
    });
}

/// Messages up to and including the last assistant reply
fn answered_prefix(messages: &[Message]) -> &[Message] {
    match messages.iter().rposition(|m| !m.is_user) {
        Some(last_reply) => &messages[..=last_reply],
        None => &[],
    }
}
