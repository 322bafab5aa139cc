//! Key derivation and at-rest encryption for provider token material.
//!
//! A cipher is derived deterministically from `(salt, secret)` with
//! PBKDF2-HMAC-SHA256 (390,000 iterations, 32-byte key), then used as
//! AES-256-GCM. Same inputs always reproduce a cipher that can decrypt
//! anything a previous derivation encrypted, across process restarts.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use crate::error::BudgetError;

const PBKDF2_ITERATIONS: u32 = 390_000;
const NONCE_SIZE: usize = 12;

/// Symmetric authenticated cipher over encrypted token blobs.
///
/// Owned by the session for its lifetime; cheap to clone.
#[derive(Clone)]
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    /// Derive a cipher from a fixed salt and a secret.
    ///
    /// Deterministic: re-derivation with the same inputs yields a cipher
    /// that decrypts blobs produced by any earlier derivation.
    pub fn derive(salt: &[u8], secret: &str) -> Result<Self, BudgetError> {
        if salt.is_empty() {
            return Err(BudgetError::Crypto("empty salt".to_string()));
        }
        let mut key = [0u8; 32];
        pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        Ok(Self { cipher })
    }

    /// Encrypt `plaintext`, prepending the random nonce to the ciphertext.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, BudgetError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| BudgetError::Crypto(format!("encryption failed: {e}")))?;
        let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(nonce.as_slice());
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Decrypt a nonce-prefixed blob produced by [`TokenCipher::encrypt`].
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, BudgetError> {
        if blob.len() < NONCE_SIZE {
            return Err(BudgetError::Crypto("ciphertext too short".to_string()));
        }
        let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| BudgetError::Crypto(format!("decryption failed: {e}")))
    }

    /// Encrypt a UTF-8 string (token fields are stored this way).
    pub fn encrypt_str(&self, plaintext: &str) -> Result<Vec<u8>, BudgetError> {
        self.encrypt(plaintext.as_bytes())
    }

    /// Decrypt a blob back into a UTF-8 string.
    pub fn decrypt_str(&self, blob: &[u8]) -> Result<String, BudgetError> {
        let bytes = self.decrypt(blob)?;
        String::from_utf8(bytes).map_err(|e| BudgetError::Crypto(format!("invalid UTF-8: {e}")))
    }
}
