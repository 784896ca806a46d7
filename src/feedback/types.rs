//! Feedback and personalization profile types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A like/dislike on one assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub message_id: String,
    pub content: String,
    pub liked: bool,
    #[serde(with = "crate::session::types::iso_millis")]
    pub timestamp: DateTime<Utc>,
}

/// Preferred response style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStyle {
    Concise,
    #[default]
    Detailed,
    Empathetic,
}

impl ResponseStyle {
    /// Prompt instruction for this style
    pub fn instruction(&self) -> &'static str {
        match self {
            ResponseStyle::Concise => "Keep responses brief and to the point.",
            ResponseStyle::Detailed => "Provide thorough, detailed explanations.",
            ResponseStyle::Empathetic => {
                "Use a warm, empathetic tone and acknowledge the user's feelings."
            }
        }
    }
}

impl std::fmt::Display for ResponseStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseStyle::Concise => write!(f, "concise"),
            ResponseStyle::Detailed => write!(f, "detailed"),
            ResponseStyle::Empathetic => write!(f, "empathetic"),
        }
    }
}

/// Personalization profile derived from the full feedback list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub preferred_style: ResponseStyle,
    pub topics_of_interest: Vec<String>,
    pub disliked_patterns: Vec<String>,
    pub effective_approaches: Vec<String>,
}
