//! Vault key management

use super::KEY_SIZE;
use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use std::path::Path;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Symmetric key protecting the durable store.
///
/// Zeroized on drop so key material does not linger in memory.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    /// Generate a new random key
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut key);
        Self(key)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Decode a base64-encoded key
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let mut decoded = STANDARD
            .decode(encoded)
            .map_err(|e| Error::Config(format!("Invalid encryption key encoding: {}", e)))?;

        if decoded.len() != KEY_SIZE {
            let len = decoded.len();
            decoded.zeroize();
            return Err(Error::Config(format!(
                "Encryption key must be {} bytes, got {}",
                KEY_SIZE, len
            )));
        }

        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self(key))
    }

    /// Encode as base64 (for writing a key file)
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Access the raw bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Write the key to a file, refusing to overwrite an existing one
    pub fn write_new(&self, path: &Path) -> Result<()> {
        if path.exists() {
            return Err(Error::Config(format!(
                "Key file already exists: {}",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_base64())?;
        Ok(())
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(****)")
    }
}
