//! CareVault configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding a base64-encoded 32-byte encryption key
pub const KEY_ENV_VAR: &str = "CAREVAULT_KEY";

/// Main CareVault configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CareVaultConfig {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session repository configuration
    #[serde(default)]
    pub sessions: SessionsConfig,

    /// Medicine lookup history configuration
    #[serde(default)]
    pub history: HistoryConfig,

    /// Feedback personalization configuration
    #[serde(default)]
    pub feedback: FeedbackConfig,

    /// Health insight configuration
    #[serde(default)]
    pub insights: InsightsConfig,
}

impl CareVaultConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the encrypted durable store
    pub data_dir: PathBuf,

    /// File holding the base64-encoded encryption key
    pub key_file: PathBuf,

    /// Assumed ceiling of the durable store in bytes
    pub quota_bytes: u64,

    /// Usage at which capacity is reported as a warning
    pub warning_bytes: u64,

    /// Usage at which capacity is reported as critical
    pub critical_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = default_base_dir();
        Self {
            data_dir: base.join("store"),
            key_file: base.join("vault.key"),
            quota_bytes: 10 * 1024 * 1024,
            warning_bytes: 5 * 1024 * 1024,
            critical_bytes: 8 * 1024 * 1024,
        }
    }
}

impl StorageConfig {
    /// Resolve the encryption key.
    ///
    /// `CAREVAULT_KEY` wins over the key file. Returns `Ok(None)` when no key
    /// is configured at all; a configured but malformed key is an error.
    pub fn resolve_key(&self) -> Result<Option<crate::crypto::EncryptionKey>> {
        if let Ok(encoded) = std::env::var(KEY_ENV_VAR) {
            return crate::crypto::EncryptionKey::from_base64(encoded.trim()).map(Some);
        }

        match std::fs::read_to_string(&self.key_file) {
            Ok(encoded) => crate::crypto::EncryptionKey::from_base64(encoded.trim()).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

/// Session repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Quiet window before a coalesced session write hits the store
    pub save_debounce_ms: u64,

    /// Generic topic that triggers smart title generation
    pub default_topic: String,

    /// Title used when nothing usable can be derived
    pub fallback_title: String,

    /// Number of words kept in a generated title
    pub title_words: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: 300,
            default_topic: "New Chat".to_string(),
            fallback_title: "Health Consultation".to_string(),
            title_words: 5,
        }
    }
}

/// Medicine lookup history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of remembered lookups
    pub max_items: usize,

    /// Quiet window before a coalesced history write hits the store
    pub save_debounce_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_items: 10,
            save_debounce_ms: 300,
        }
    }
}

/// Feedback personalization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Number of most recent feedback records kept
    pub max_records: usize,

    /// Feedback count required before prompts are adapted
    pub min_feedback_for_adaptation: usize,

    /// Liked fraction with empathy markers above which the style is empathetic
    pub empathy_ratio: f64,

    /// Mean liked length below which the style is concise
    pub concise_max_len: f64,

    /// Mean disliked length above which responses are "overly lengthy"
    pub lengthy_min_len: f64,

    /// Mean disliked length below which responses are "too brief"
    pub brief_max_len: f64,

    /// Disliked fraction with jargon above which jargon is avoided
    pub jargon_ratio: f64,

    /// Liked fraction with a marker above which an approach counts as effective
    pub approach_ratio: f64,

    /// Maximum number of topics of interest
    pub max_topics: usize,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            max_records: 100,
            min_feedback_for_adaptation: 3,
            empathy_ratio: 0.4,
            concise_max_len: 300.0,
            lengthy_min_len: 500.0,
            brief_max_len: 100.0,
            jargon_ratio: 0.3,
            approach_ratio: 0.3,
            max_topics: 5,
        }
    }
}

/// Health insight configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    /// Remote text-understanding endpoint; heuristics only when unset
    pub endpoint: Option<String>,

    /// Remote call timeout in milliseconds
    pub timeout_ms: u64,

    /// Occurrences before a symptom produces an insight
    pub recurring_threshold: usize,

    /// Occurrences before a lifestyle adjustment is suggested
    pub frequent_threshold: usize,

    /// Average severity at or above which trigger logging is suggested
    pub high_severity: f64,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: 10_000,
            recurring_threshold: 3,
            frequent_threshold: 5,
            high_severity: 7.0,
        }
    }
}

/// Default base directory (~/.carevault/)
pub fn default_base_dir() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".carevault")
}
