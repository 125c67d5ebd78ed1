//! Stored-form encoding of credentials.
//!
//! A stored credential is one of:
//!
//! ```text
//! PLAIN:<secret>             development fallback, unencrypted
//! base64(iv || ciphertext)   AES-256-GCM envelope
//! xai-… / sk-… / AIza…       legacy value written before encryption existed
//! ```
//!
//! [`parse_stored_form`] is the only place that inspects these shapes.
//! `encrypt` propagates failures; `decrypt` never fails and hands back
//! anything it cannot decrypt unchanged, because rows written before
//! encryption was introduced must stay readable.

use std::sync::Arc;

use crate::cipher::{self, Envelope};
use crate::config::RuntimeContext;
use crate::errors::CredentialError;
use crate::keys::{derive_key, KeyMaterial, SymmetricKey};
use crate::labels::{IV_LEN, MIN_ENVELOPE_B64_LEN, PLAIN_PREFIX};
use crate::observer::{CredentialEvent, DiagnosticSink, PassThroughReason, SecretPreview};
use crate::policy::{self, CodecMode};
use crate::registry;

/// Structural reading of a stored credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredForm {
    /// `PLAIN:`-tagged value.
    Plain(String),
    /// Decodable AES-GCM envelope.
    Encrypted(Envelope),
    /// Anything else, kept verbatim.
    Legacy { value: String, reason: PassThroughReason },
}

impl StoredForm {
    /// The string persisted for this form.
    pub fn encode(&self) -> String {
        match self {
            Self::Plain(secret) => format!("{PLAIN_PREFIX}{secret}"),
            Self::Encrypted(envelope) => envelope.to_base64(),
            Self::Legacy { value, .. } => value.clone(),
        }
    }
}

/// Base64 charset and at least enough characters for an IV and a tag.
fn has_base64_shape(value: &str) -> bool {
    value.len() >= MIN_ENVELOPE_B64_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
}

/// Classify a stored value by structure alone.
pub fn parse_stored_form(stored: &str) -> StoredForm {
    if let Some(secret) = stored.strip_prefix(PLAIN_PREFIX) {
        return StoredForm::Plain(secret.to_string());
    }

    if registry::known_prefix(stored).is_some() {
        return StoredForm::Legacy {
            value: stored.to_string(),
            reason: PassThroughReason::LegacyProviderPrefix,
        };
    }

    if has_base64_shape(stored) {
        return match Envelope::from_base64(stored) {
            Ok(envelope) => StoredForm::Encrypted(envelope),
            Err(_) => StoredForm::Legacy {
                value: stored.to_string(),
                reason: PassThroughReason::MalformedEnvelope,
            },
        };
    }

    StoredForm::Legacy {
        value: stored.to_string(),
        reason: PassThroughReason::Unrecognized,
    }
}

/// IV draws allowed before giving up on an unambiguous envelope.
const MAX_SEAL_ATTEMPTS: usize = 4;

/// Encrypt and encode, redrawing the IV while the encoded envelope would read
/// back as a legacy provider key.
///
/// `AIza` is valid base64 (IV bytes `00 8c da`), so roughly one envelope in
/// 2^24 would otherwise be passed through by `parse_stored_form` undecrypted.
fn seal_unambiguous<F>(key: &SymmetricKey, plaintext: &str, mut next_iv: F) -> Result<String, CredentialError>
where
    F: FnMut() -> Result<[u8; IV_LEN], CredentialError>,
{
    for _ in 0..MAX_SEAL_ATTEMPTS {
        let stored = cipher::encrypt_with_iv(key, next_iv()?, plaintext)?.to_base64();
        if registry::known_prefix(&stored).is_none() {
            return Ok(stored);
        }
    }
    Err(CredentialError::EncryptionFailed(
        "every IV drawn produced a legacy key prefix".to_string(),
    ))
}

/// Whether `stored` is an encrypted envelope.
pub fn is_encrypted(stored: &str) -> bool {
    matches!(parse_stored_form(stored), StoredForm::Encrypted(_))
}

/// Encrypts credentials for storage and reads them back.
pub struct SecretCodec {
    key_material: KeyMaterial,
    sink: Arc<dyn DiagnosticSink>,
}

impl SecretCodec {
    pub fn new(key_material: KeyMaterial, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { key_material, sink }
    }

    /// Turn a plaintext credential into its stored form.
    ///
    /// The fallback policy is evaluated on every call.
    pub fn encrypt(&self, plaintext: &str, ctx: &RuntimeContext) -> Result<String, CredentialError> {
        if plaintext.is_empty() {
            return Err(CredentialError::EmptyInput);
        }

        let mode = policy::resolve_for(ctx);
        self.sink.record(&CredentialEvent::PolicyResolved {
            mode,
            is_secure_context: ctx.is_secure_context,
            is_development_build: ctx.is_development_build,
        });

        match mode {
            CodecMode::Reject => Err(CredentialError::EncryptionUnavailable),
            CodecMode::Fallback => Ok(self.encode_fallback(plaintext)),
            CodecMode::Strict => match self.encrypt_strict(plaintext, ctx) {
                Ok(stored) => {
                    self.sink.record(&CredentialEvent::Encrypted {
                        input_len: plaintext.len(),
                        output_len: stored.len(),
                        mode,
                    });
                    Ok(stored)
                }
                Err(e) => self.on_strict_failure(e, plaintext, ctx),
            },
        }
    }

    fn encrypt_strict(&self, plaintext: &str, ctx: &RuntimeContext) -> Result<String, CredentialError> {
        let key = derive_key(&self.key_material, ctx)?;
        seal_unambiguous(&key, plaintext, cipher::random_iv)
    }

    /// Development builds degrade to the tagged plaintext; anything else
    /// surfaces the error.
    fn on_strict_failure(
        &self,
        e: CredentialError,
        plaintext: &str,
        ctx: &RuntimeContext,
    ) -> Result<String, CredentialError> {
        let fell_back = policy::allows_fallback(ctx);
        self.sink.record(&CredentialEvent::EncryptFailed {
            reason: e.to_string(),
            fell_back,
        });
        if fell_back {
            Ok(self.encode_fallback(plaintext))
        } else {
            Err(e)
        }
    }

    fn encode_fallback(&self, plaintext: &str) -> String {
        let stored = StoredForm::Plain(plaintext.to_string()).encode();
        self.sink.record(&CredentialEvent::Encrypted {
            input_len: plaintext.len(),
            output_len: stored.len(),
            mode: CodecMode::Fallback,
        });
        stored
    }

    /// Read a stored credential back. Never fails.
    ///
    /// An empty input means "no credential" and yields an empty string.
    pub fn decrypt(&self, stored: &str, ctx: &RuntimeContext) -> String {
        if stored.is_empty() {
            return String::new();
        }

        match parse_stored_form(stored) {
            StoredForm::Plain(secret) => {
                self.sink.record(&CredentialEvent::PlainTagRead {
                    output_len: secret.len(),
                });
                secret
            }
            StoredForm::Encrypted(envelope) => match self.decrypt_envelope(&envelope, ctx) {
                Ok(secret) => {
                    self.sink.record(&CredentialEvent::Decrypted {
                        input_len: stored.len(),
                        output_len: secret.len(),
                    });
                    secret
                }
                Err(_) => self.pass_through(stored, PassThroughReason::DecryptionFailed),
            },
            StoredForm::Legacy { value, reason } => self.pass_through(&value, reason),
        }
    }

    fn decrypt_envelope(&self, envelope: &Envelope, ctx: &RuntimeContext) -> Result<String, CredentialError> {
        let key = derive_key(&self.key_material, ctx)?;
        cipher::decrypt(&key, envelope)
    }

    fn pass_through(&self, stored: &str, reason: PassThroughReason) -> String {
        self.sink.record(&CredentialEvent::DecryptPassThrough {
            preview: SecretPreview::of(stored),
            reason,
        });
        stored.to_string()
    }

    /// Encrypt then decrypt `plaintext` and report whether it survived.
    pub fn roundtrip(&self, plaintext: &str, ctx: &RuntimeContext) -> bool {
        match self.encrypt(plaintext, ctx) {
            Ok(stored) => self.decrypt(&stored, ctx) == plaintext,
            Err(_) => false,
        }
    }
}
