//! Cryptographic utilities for encryption at rest
//!
//! Values are sealed with AES-256-GCM under a single vault key. A sealed value
//! is a self-describing string: `v1:` followed by base64 of nonce || ciphertext.
//! Layers above the store never look inside it.

mod keys;
mod store;

pub use keys::EncryptionKey;
pub use store::CryptoStore;

use crate::error::{Error, Result};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;

/// AES-256-GCM encryption key size
pub const KEY_SIZE: usize = 32;

/// Nonce size for AES-GCM
pub const NONCE_SIZE: usize = 12;

/// Version prefix of the sealed string format
pub const ENVELOPE_PREFIX: &str = "v1:";

/// Encrypt data using AES-256-GCM
pub fn encrypt(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| Error::Crypto(format!("Failed to create cipher: {}", e)))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;

    // Prepend nonce to ciphertext
    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

/// Decrypt data using AES-256-GCM
pub fn decrypt(key: &[u8; KEY_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() < NONCE_SIZE {
        return Err(Error::Crypto("Ciphertext too short".to_string()));
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| Error::Crypto(format!("Failed to create cipher: {}", e)))?;

    let nonce = Nonce::from_slice(&ciphertext[..NONCE_SIZE]);
    let encrypted = &ciphertext[NONCE_SIZE..];

    cipher
        .decrypt(nonce, encrypted)
        .map_err(|e| Error::Crypto(format!("Decryption failed: {}", e)))
}

/// Encrypt and wrap into the versioned string envelope
pub fn seal(key: &EncryptionKey, plaintext: &[u8]) -> Result<String> {
    let bytes = encrypt(key.as_bytes(), plaintext)?;
    Ok(format!("{}{}", ENVELOPE_PREFIX, STANDARD.encode(bytes)))
}

/// Unwrap the versioned string envelope and decrypt
pub fn open(key: &EncryptionKey, sealed: &str) -> Result<Vec<u8>> {
    let body = sealed
        .strip_prefix(ENVELOPE_PREFIX)
        .ok_or_else(|| Error::Crypto("Unknown envelope format".to_string()))?;
    let bytes = STANDARD
        .decode(body)
        .map_err(|e| Error::Crypto(format!("Invalid base64: {}", e)))?;
    decrypt(key.as_bytes(), &bytes)
}
