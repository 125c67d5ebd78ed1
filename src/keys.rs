//! Symmetric key derivation from the configured key material.
//!
//! key = SHA-256(seed bytes)
//!
//! The derivation is recomputed on every operation; nothing is cached.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::RuntimeContext;
use crate::errors::CredentialError;

/// The key-material seed, supplied by the environment or a secrets manager.
pub struct KeyMaterial(SecretString);

impl KeyMaterial {
    pub fn new(seed: SecretString) -> Self {
        Self(seed)
    }
}

impl From<&str> for KeyMaterial {
    fn from(seed: &str) -> Self {
        Self(SecretString::from(seed.to_string()))
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial([REDACTED])")
    }
}

/// A 256-bit AES key. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; 32]);

impl SymmetricKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Non-secret identifier for diagnostics: hex of the first 8 bytes of SHA-256(key).
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0);
        hex::encode(&digest[..8])
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SymmetricKey({})", self.fingerprint())
    }
}

/// Derive the symmetric key for the current call.
///
/// Fails with `CryptoUnavailable` instead of handing out a weak key when the
/// runtime cannot do real crypto.
pub fn derive_key(material: &KeyMaterial, ctx: &RuntimeContext) -> Result<SymmetricKey, CredentialError> {
    if !ctx.has_crypto_capability {
        return Err(CredentialError::CryptoUnavailable);
    }

    let mut hasher = Sha256::new();
    hasher.update(material.0.expose_secret().as_bytes());
    let digest = hasher.finalize();

    let mut key = [0u8; 32];
    key.copy_from_slice(&digest);
    Ok(SymmetricKey(key))
}
