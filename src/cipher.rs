//! AES-256-GCM encryption of credential strings.
//!
//! Envelope layout, base64-encoded for storage:
//!
//! ```text
//! iv(12) || ciphertext || tag(16)
//! ```
//!
//! The IV length is fixed, so the envelope needs no length field.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::errors::CredentialError;
use crate::keys::SymmetricKey;
use crate::labels::{IV_LEN, TAG_LEN};

/// An IV together with the ciphertext it was used for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub iv: [u8; IV_LEN],
    /// Ciphertext with the GCM tag appended.
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// base64(iv || ciphertext)
    pub fn to_base64(&self) -> String {
        let mut packed = Vec::with_capacity(IV_LEN + self.ciphertext.len());
        packed.extend_from_slice(&self.iv);
        packed.extend_from_slice(&self.ciphertext);
        STANDARD.encode(&packed)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, CredentialError> {
        let data = STANDARD.decode(encoded)?;
        if data.len() < IV_LEN + TAG_LEN {
            return Err(CredentialError::InvalidCiphertext);
        }
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&data[..IV_LEN]);
        Ok(Self {
            iv,
            ciphertext: data[IV_LEN..].to_vec(),
        })
    }
}

/// Draw a fresh IV from the OS random source.
pub(crate) fn random_iv() -> Result<[u8; IV_LEN], CredentialError> {
    let mut iv = [0u8; IV_LEN];
    getrandom::getrandom(&mut iv).map_err(|_| CredentialError::CryptoUnavailable)?;
    Ok(iv)
}

/// Encrypt `plaintext` under `key` with a new random IV.
pub fn encrypt(key: &SymmetricKey, plaintext: &str) -> Result<Envelope, CredentialError> {
    encrypt_with_iv(key, random_iv()?, plaintext)
}

/// Encrypt with a caller-chosen IV. The IV must never repeat under one key.
pub(crate) fn encrypt_with_iv(
    key: &SymmetricKey,
    iv: [u8; IV_LEN],
    plaintext: &str,
) -> Result<Envelope, CredentialError> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CredentialError::EncryptionFailed(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|e| CredentialError::EncryptionFailed(e.to_string()))?;

    Ok(Envelope { iv, ciphertext })
}

/// Decrypt and authenticate an envelope.
pub fn decrypt(key: &SymmetricKey, envelope: &Envelope) -> Result<String, CredentialError> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| CredentialError::DecryptionFailed)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&envelope.iv), envelope.ciphertext.as_slice())
        .map_err(|_| CredentialError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| CredentialError::DecryptionFailed)
}
