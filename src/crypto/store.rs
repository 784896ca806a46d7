//! Encrypting key/value store
//!
//! Serializes values to JSON, seals them, and hands the ciphertext string to a
//! `KvBackend`. Reads are self-healing: a value that cannot be opened or
//! decoded is deleted and reported as absent, so later reads never retry the
//! stale data.

use super::{open, seal, EncryptionKey};
use crate::error::{Error, Result};
use crate::storage::KvBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Encrypted view over a durable backend
pub struct CryptoStore {
    backend: Arc<dyn KvBackend>,
    key: Option<EncryptionKey>,
}

impl CryptoStore {
    /// Create a store. With `key == None` every item operation fails with
    /// `EncryptionUnavailable`.
    pub fn new(backend: Arc<dyn KvBackend>, key: Option<EncryptionKey>) -> Self {
        Self { backend, key }
    }

    /// Whether a key is configured
    pub fn is_available(&self) -> bool {
        self.key.is_some()
    }

    fn key(&self) -> Result<&EncryptionKey> {
        self.key.as_ref().ok_or(Error::EncryptionUnavailable)
    }

    /// Serialize, encrypt and store a value
    pub fn set_item<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let vault_key = self.key()?;
        let plaintext = serde_json::to_string(value)?;
        let sealed = seal(vault_key, plaintext.as_bytes())?;

        if !plaintext.is_empty() && sealed == plaintext {
            return Err(Error::Crypto(format!(
                "Refusing to store '{}': ciphertext equals plaintext",
                key
            )));
        }

        self.backend.set(key, &sealed)
    }

    /// Read and decrypt a value.
    ///
    /// Returns `Ok(None)` for absent values and for corrupt values; a corrupt
    /// value is removed from the backend as part of this call. The only error
    /// is `EncryptionUnavailable`.
    pub fn get_item<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let vault_key = self.key()?;

        let sealed = match self.backend.get(key) {
            Ok(Some(sealed)) => sealed,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!(key = %key, "Failed to read stored value: {}", e);
                return Ok(None);
            }
        };

        match Self::decode(vault_key, key, &sealed) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key = %key, "Discarding unreadable stored value: {}", e);
                if let Err(e) = self.backend.remove(key) {
                    tracing::warn!(key = %key, "Failed to remove corrupt value: {}", e);
                }
                Ok(None)
            }
        }
    }

    fn decode<T: DeserializeOwned>(vault_key: &EncryptionKey, key: &str, sealed: &str) -> Result<T> {
        let corrupt = |reason: String| Error::CorruptEntry {
            key: key.to_string(),
            reason,
        };
        let plaintext = open(vault_key, sealed).map_err(|e| corrupt(e.to_string()))?;
        serde_json::from_slice(&plaintext).map_err(|e| corrupt(e.to_string()))
    }

    /// Delete a value
    pub fn remove_item(&self, key: &str) -> Result<()> {
        self.backend.remove(key)
    }

    /// Delete every value
    pub fn clear(&self) -> Result<()> {
        self.backend.clear()
    }

    /// Raw ciphertext entries, ordered by key
    pub fn entries(&self) -> Result<Vec<(String, String)>> {
        self.backend.entries()
    }

    /// Export the whole store as a JSON object of key to ciphertext string.
    ///
    /// The blob stays encrypted; it can only be read back with the same key.
    pub fn export_encrypted_blob(&self) -> Result<String> {
        let entries: BTreeMap<String, String> = self.backend.entries()?.into_iter().collect();
        Ok(serde_json::to_string_pretty(&entries)?)
    }
}
