//! Conversation session types
//!
//! Persisted as camelCase JSON with ISO-8601 timestamps at millisecond
//! precision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub content: String,
    pub is_user: bool,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a user-authored message stamped now
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, true, Utc::now())
    }

    /// Create an assistant reply stamped now
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(content, false, Utc::now())
    }

    /// Create a message with an explicit timestamp
    pub fn new(content: impl Into<String>, is_user: bool, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            is_user,
            timestamp: truncate_millis(timestamp),
        }
    }
}

/// A conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub topic: String,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

impl ChatSession {
    /// Time of the latest message, or creation time for an empty session
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.messages
            .iter()
            .map(|m| m.timestamp)
            .max()
            .unwrap_or(self.created_at)
    }

    /// Messages authored by the user
    pub fn user_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.is_user)
    }
}

/// Drop sub-millisecond precision so in-memory values equal reloaded ones
pub fn truncate_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}

/// Serde adapter: `DateTime<Utc>` as RFC 3339 with milliseconds (`...T12:00:00.123Z`)
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session_at(ts: DateTime<Utc>) -> ChatSession {
        ChatSession {
            id: "s1".to_string(),
            topic: "Migraine".to_string(),
            created_at: ts,
            messages: vec![
                Message::new("My head hurts", true, ts),
                Message::new("How long has it hurt?", false, ts + chrono::Duration::seconds(2)),
            ],
            pinned: false,
            rating: None,
        }
    }

    #[test]
    fn test_dates_roundtrip_to_the_millisecond() {
        let ts = Utc.timestamp_millis_opt(1_717_171_717_123).unwrap();
        let session = session_at(ts);

        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("2024-05-31T16:08:37.123Z"));

        let back: ChatSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back.created_at.timestamp_millis(), 1_717_171_717_123);
        assert_eq!(back, session);
    }

    #[test]
    fn test_camel_case_fields() {
        let session = session_at(Utc::now());
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json["messages"][0].get("isUser").is_some());
        // Unset flags are omitted
        assert!(json.get("pinned").is_none());
        assert!(json.get("rating").is_none());
    }

    #[test]
    fn test_missing_flags_default() {
        let json = r#"{"id":"a","topic":"t","createdAt":"2024-01-01T00:00:00.000Z","messages":[]}"#;
        let session: ChatSession = serde_json::from_str(json).unwrap();
        assert!(!session.pinned);
        assert!(session.rating.is_none());
        assert_eq!(session.last_activity(), session.created_at);
    }

    #[test]
    fn test_accepts_offset_timestamps() {
        let json = r#"{"id":"a","topic":"t","createdAt":"2024-01-01T02:00:00+02:00","messages":[]}"#;
        let session: ChatSession = serde_json::from_str(json).unwrap();
        assert_eq!(
            session.created_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_last_activity_and_user_messages() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let session = session_at(ts);
        assert_eq!(session.last_activity(), ts + chrono::Duration::seconds(2));
        assert_eq!(session.user_messages().count(), 1);
    }
}
