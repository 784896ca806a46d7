//! CareVault error types

use thiserror::Error;

/// CareVault error type
#[derive(Error, Debug)]
pub enum Error {
    /// No encryption key is configured for the durable store
    #[error("Encryption unavailable: no encryption key configured")]
    EncryptionUnavailable,

    /// Cryptographic error
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// A stored value could not be decrypted or decoded
    #[error("Corrupt entry '{key}': {reason}")]
    CorruptEntry { key: String, reason: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store would grow past its byte ceiling
    #[error("Quota exceeded: {needed} bytes needed, ceiling is {ceiling} bytes")]
    QuotaExceeded { needed: u64, ceiling: u64 },

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Remote insight collaborator error
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for CareVault operations
pub type Result<T> = std::result::Result<T, Error>;
