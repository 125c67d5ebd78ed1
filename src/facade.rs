//! Public entry points used by the settings UI and the provider clients.
//!
//! The facade ties validation, sanitization and the codec together and owns
//! the diagnostic sink they report to.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codec::SecretCodec;
use crate::config::{CredentialConfig, RuntimeContext};
use crate::errors::CredentialError;
use crate::keys::KeyMaterial;
use crate::labels::{FORMAT_CORRUPTED, FORMAT_UNKNOWN, MASK_BULLETS, MASK_EDGE};
use crate::observer::{CredentialEvent, DiagnosticSink, SecretPreview};
use crate::registry::{self, ProviderKind};
use crate::sanitize::{self, sanitize_headers};

/// Anthropic API version sent alongside the key.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Field names that look like a credential when found outside the
/// authoritative field.
const CREDENTIAL_LIKE_FIELDS: [&str; 7] = [
    "api_key",
    "apiKey",
    "key",
    "token",
    "secret",
    "decrypted_api_key",
    "encrypted_api_key",
];

/// A provider row as delivered by the storage layer.
///
/// Only `decrypted_api_key` is authoritative. `config` and any other fields
/// are kept so they can be checked for interference, never to be read from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderRecord {
    #[serde(alias = "provider_identifier", alias = "providerType")]
    pub provider_type: String,
    #[serde(default, alias = "decryptedApiKey")]
    pub decrypted_api_key: Option<String>,
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProviderRecord {
    pub fn new(provider_type: impl Into<String>, decrypted_api_key: impl Into<String>) -> Self {
        Self {
            provider_type: provider_type.into(),
            decrypted_api_key: Some(decrypted_api_key.into()),
            ..Self::default()
        }
    }
}

/// Never-failing result of [`CredentialFacade::retrieve_credential_safe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedCredential {
    pub secret: String,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Mask a secret for display.
///
/// Short secrets are fully hidden. Longer ones keep four characters at each
/// end around a fixed bullet run, so the mask never reveals the length.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= MASK_EDGE * 2 {
        return MASK_BULLETS.to_string();
    }
    let head: String = chars[..MASK_EDGE].iter().collect();
    let tail: String = chars[chars.len() - MASK_EDGE..].iter().collect();
    format!("{head}{MASK_BULLETS}{tail}")
}

pub struct CredentialFacade {
    codec: SecretCodec,
    sink: Arc<dyn DiagnosticSink>,
}

impl CredentialFacade {
    pub fn new(key_material: KeyMaterial, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            codec: SecretCodec::new(key_material, sink.clone()),
            sink,
        }
    }

    /// Build a facade from loaded configuration, returning the runtime context
    /// to pass into store/reveal calls.
    pub fn from_config(config: CredentialConfig, sink: Arc<dyn DiagnosticSink>) -> (Self, RuntimeContext) {
        (Self::new(config.key_material, sink), config.runtime)
    }

    pub fn codec(&self) -> &SecretCodec {
        &self.codec
    }

    pub fn mask_secret(&self, secret: &str) -> String {
        mask_secret(secret)
    }

    /// Read the credential from its single authoritative field.
    pub fn retrieve_credential(&self, record: &ProviderRecord) -> Result<String, CredentialError> {
        self.report_interference(record);

        match record.decrypted_api_key.as_deref() {
            Some(secret) if !secret.trim().is_empty() => Ok(secret.to_string()),
            _ => {
                self.sink.record(&CredentialEvent::CredentialMissing {
                    provider: record.provider_type.clone(),
                });
                Err(CredentialError::EmptyInput)
            }
        }
    }

    /// Retrieve, clean and validate without ever failing.
    pub fn retrieve_credential_safe(&self, record: &ProviderRecord) -> RetrievedCredential {
        let raw = match self.retrieve_credential(record) {
            Ok(raw) => raw,
            Err(_) => {
                return RetrievedCredential {
                    secret: String::new(),
                    is_valid: false,
                    error: Some(format!(
                        "No API key configured for provider '{}'",
                        record.provider_type
                    )),
                }
            }
        };

        let result = self.sanitize_secret(&raw, &record.provider_type);
        RetrievedCredential {
            secret: result.sanitized_value,
            is_valid: result.is_valid,
            error: result.error,
        }
    }

    /// Clean and validate a credential, reporting what happened.
    pub fn sanitize_secret(&self, raw: &str, provider_id: &str) -> sanitize::SanitizationResult {
        let result = sanitize::sanitize_secret(raw, provider_id);

        let removed_chars = raw.chars().count().saturating_sub(result.sanitized_value.chars().count());
        if removed_chars > 0 {
            self.sink.record(&CredentialEvent::Sanitized {
                provider: provider_id.to_string(),
                removed_chars,
            });
        }
        if !result.is_valid {
            self.sink.record(&CredentialEvent::ValidationFailed {
                provider: provider_id.to_string(),
                format_label: validation_label(&result),
                preview: SecretPreview::of(&result.sanitized_value),
            });
        }
        result
    }

    /// Clean, validate and encrypt a credential the user just entered.
    ///
    /// The corruption check runs before the codec ever derives a key.
    pub fn prepare_for_storage(
        &self,
        raw: &str,
        provider_id: &str,
        ctx: &RuntimeContext,
    ) -> Result<String, CredentialError> {
        let result = self.sanitize_secret(raw, provider_id);
        if result.sanitized_value.is_empty() {
            return Err(CredentialError::EmptyInput);
        }
        if !result.is_valid {
            if registry::is_corruption_signature(&result.sanitized_value) {
                return Err(CredentialError::CorruptedCredential);
            }
            return Err(CredentialError::FormatInvalid {
                provider: provider_id.to_string(),
                message: result.error.unwrap_or_else(|| "format not recognized".to_string()),
            });
        }

        self.codec.encrypt(&result.sanitized_value, ctx)
    }

    /// Read a stored credential back; see [`SecretCodec::decrypt`].
    pub fn reveal(&self, stored: &str, ctx: &RuntimeContext) -> String {
        self.codec.decrypt(stored, ctx)
    }

    /// Authentication headers for a provider request, already sanitized.
    pub fn auth_headers(
        &self,
        provider_id: &str,
        secret: &str,
    ) -> Result<BTreeMap<String, String>, CredentialError> {
        let bearer = format!("Bearer {secret}");
        let pairs: Vec<(&str, &str)> = match ProviderKind::from_id(provider_id) {
            Some(ProviderKind::Anthropic) => vec![
                ("x-api-key", secret),
                ("anthropic-version", ANTHROPIC_VERSION),
            ],
            Some(ProviderKind::Google) => vec![("x-goog-api-key", secret)],
            Some(ProviderKind::OpenAi) | Some(ProviderKind::Grok) | None => {
                vec![("Authorization", bearer.as_str())]
            }
        };

        let result = sanitize_headers(pairs.into_iter().map(|(name, value)| (name, Some(value))));
        if !result.valid {
            return Err(CredentialError::HeaderValueInvalid(result.errors.join("; ")));
        }
        Ok(result.headers)
    }

    fn report_interference(&self, record: &ProviderRecord) {
        let config_fields = record
            .config
            .as_ref()
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|config| config.iter().map(|(k, v)| (format!("config.{k}"), k, v)));
        let extra_fields = record.extra.iter().map(|(k, v)| (k.clone(), k, v));

        for (path, name, value) in config_fields.chain(extra_fields) {
            if !CREDENTIAL_LIKE_FIELDS.contains(&name.as_str()) {
                continue;
            }
            let Some(text) = value.as_str().filter(|s| !s.is_empty()) else {
                continue;
            };
            self.sink.record(&CredentialEvent::ConfigInterference {
                provider: record.provider_type.clone(),
                field: path,
                preview: SecretPreview::of(text),
            });
        }
    }
}

fn validation_label(result: &sanitize::SanitizationResult) -> &'static str {
    match result.format_label.as_deref() {
        Some(FORMAT_CORRUPTED) => FORMAT_CORRUPTED,
        _ => FORMAT_UNKNOWN,
    }
}
