//! Diagnostic port for credential operations.
//!
//! The codec and facade never log directly. They hand a [`CredentialEvent`]
//! to an injected [`DiagnosticSink`], and the sink decides where it goes:
//!
//! | Sink | Description |
//! |------|-------------|
//! | [`NoopSink`] | Discards everything |
//! | [`TracingSink`] | Emits structured events via `tracing` |
//! | [`RecordingSink`] | Keeps events in memory for assertions |
//!
//! Events never carry a secret. The only secret-derived text they can hold
//! is a [`SecretPreview`], which keeps at most the first few characters.

use std::fmt;
use std::sync::Mutex;

use crate::labels::LOG_PREVIEW_LEN;
use crate::policy::CodecMode;

/// Receiver for credential diagnostics.
///
/// Thread-safe and shared behind `Arc<dyn DiagnosticSink>`.
pub trait DiagnosticSink: Send + Sync {
    /// Record one event.
    fn record(&self, event: &CredentialEvent);

    /// Human-readable backend name (e.g. "noop", "tracing").
    fn name(&self) -> &str;
}

/// Redacted view of a secret: the first few characters and the total length.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretPreview {
    prefix: String,
    len: usize,
}

impl SecretPreview {
    pub fn of(secret: &str) -> Self {
        Self {
            prefix: secret.chars().take(LOG_PREVIEW_LEN).collect(),
            len: secret.chars().count(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for SecretPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}… ({} chars)", self.prefix, self.len)
    }
}

impl fmt::Debug for SecretPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretPreview({self})")
    }
}

/// Why `decrypt` handed a stored value back without decrypting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassThroughReason {
    /// Bare provider-prefixed key written before encryption existed.
    LegacyProviderPrefix,
    /// Not tagged and not base64-shaped.
    Unrecognized,
    /// Base64-shaped but not a decodable envelope.
    MalformedEnvelope,
    /// Envelope failed authentication or the key was unavailable.
    DecryptionFailed,
}

impl PassThroughReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LegacyProviderPrefix => "legacy_provider_prefix",
            Self::Unrecognized => "unrecognized",
            Self::MalformedEnvelope => "malformed_envelope",
            Self::DecryptionFailed => "decryption_failed",
        }
    }
}

/// Discrete events emitted by the codec, sanitizer and facade.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialEvent {
    /// The fallback policy was evaluated for an encrypt call.
    PolicyResolved {
        mode: CodecMode,
        is_secure_context: bool,
        is_development_build: bool,
    },

    /// A credential was turned into its stored form.
    Encrypted { input_len: usize, output_len: usize, mode: CodecMode },

    /// Strict encryption failed.
    EncryptFailed { reason: String, fell_back: bool },

    /// A stored value was decrypted.
    Decrypted { input_len: usize, output_len: usize },

    /// A stored value was returned unchanged.
    DecryptPassThrough { preview: SecretPreview, reason: PassThroughReason },

    /// A fallback-tagged value was read back.
    PlainTagRead { output_len: usize },

    /// Control characters or surrounding whitespace were removed.
    Sanitized { provider: String, removed_chars: usize },

    /// A credential did not pass format validation.
    ValidationFailed { provider: String, format_label: &'static str, preview: SecretPreview },

    /// A credential-shaped value sat outside the authoritative field.
    ConfigInterference { provider: String, field: String, preview: SecretPreview },

    /// The authoritative credential field was absent or blank.
    CredentialMissing { provider: String },
}

/// Sink that discards every event.
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn record(&self, _event: &CredentialEvent) {}

    fn name(&self) -> &str {
        "noop"
    }
}

/// Sink that logs events via `tracing`.
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: &CredentialEvent) {
        match event {
            CredentialEvent::PolicyResolved {
                mode,
                is_secure_context,
                is_development_build,
            } => {
                tracing::debug!(
                    mode = mode.as_str(),
                    is_secure_context,
                    is_development_build,
                    "credential: policy.resolved"
                );
            }
            CredentialEvent::Encrypted {
                input_len,
                output_len,
                mode,
            } => {
                if *mode == CodecMode::Fallback {
                    tracing::warn!(
                        input_len,
                        output_len,
                        "credential: stored WITHOUT encryption (development fallback)"
                    );
                } else {
                    tracing::debug!(input_len, output_len, mode = mode.as_str(), "credential: encrypted");
                }
            }
            CredentialEvent::EncryptFailed { reason, fell_back } => {
                tracing::warn!(error = reason.as_str(), fell_back, "credential: encrypt.failed");
            }
            CredentialEvent::Decrypted {
                input_len,
                output_len,
            } => {
                tracing::debug!(input_len, output_len, "credential: decrypted");
            }
            CredentialEvent::DecryptPassThrough { preview, reason } => {
                tracing::info!(
                    prefix = preview.prefix(),
                    len = preview.len(),
                    reason = reason.as_str(),
                    "credential: decrypt.pass_through"
                );
            }
            CredentialEvent::PlainTagRead { output_len } => {
                tracing::warn!(output_len, "credential: read fallback-tagged plaintext value");
            }
            CredentialEvent::Sanitized {
                provider,
                removed_chars,
            } => {
                tracing::info!(provider, removed_chars, "credential: sanitized");
            }
            CredentialEvent::ValidationFailed {
                provider,
                format_label,
                preview,
            } => {
                tracing::warn!(
                    provider,
                    format_label,
                    prefix = preview.prefix(),
                    len = preview.len(),
                    "credential: validation.failed"
                );
            }
            CredentialEvent::ConfigInterference {
                provider,
                field,
                preview,
            } => {
                tracing::warn!(
                    provider,
                    field,
                    prefix = preview.prefix(),
                    "credential: ignoring key found in provider config"
                );
            }
            CredentialEvent::CredentialMissing { provider } => {
                tracing::info!(provider, "credential: missing");
            }
        }
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

/// Sink that keeps every event in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<CredentialEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<CredentialEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DiagnosticSink for RecordingSink {
    fn record(&self, event: &CredentialEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }

    fn name(&self) -> &str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_keeps_only_leading_chars() {
        let preview = SecretPreview::of("xai-supersecretvalue");
        assert_eq!(preview.prefix(), "xai-");
        assert_eq!(preview.len(), 20);
        assert!(!preview.to_string().contains("supersecret"));
        assert!(!format!("{preview:?}").contains("supersecret"));
    }

    #[test]
    fn preview_of_short_secret() {
        let preview = SecretPreview::of("ab");
        assert_eq!(preview.prefix(), "ab");
        assert_eq!(preview.len(), 2);
        assert!(SecretPreview::of("").is_empty());
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let preview = SecretPreview::of("ключ-секрет");
        assert_eq!(preview.prefix(), "ключ");
    }

    #[test]
    fn recording_sink_captures_in_order() {
        let sink = RecordingSink::new();
        sink.record(&CredentialEvent::CredentialMissing {
            provider: "openai".into(),
        });
        sink.record(&CredentialEvent::PlainTagRead { output_len: 3 });
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], CredentialEvent::PlainTagRead { output_len: 3 }));
    }

    #[test]
    fn sinks_report_names() {
        assert_eq!(NoopSink.name(), "noop");
        assert_eq!(TracingSink.name(), "tracing");
        assert_eq!(RecordingSink::new().name(), "recording");
    }

    #[test]
    fn tracing_sink_accepts_every_event() {
        let preview = SecretPreview::of("sk-test-value");
        let events = vec![
            CredentialEvent::PolicyResolved {
                mode: CodecMode::Strict,
                is_secure_context: true,
                is_development_build: false,
            },
            CredentialEvent::Encrypted {
                input_len: 10,
                output_len: 60,
                mode: CodecMode::Fallback,
            },
            CredentialEvent::DecryptPassThrough {
                preview: preview.clone(),
                reason: PassThroughReason::Unrecognized,
            },
            CredentialEvent::ConfigInterference {
                provider: "openai".into(),
                field: "api_key".into(),
                preview,
            },
        ];
        for event in &events {
            TracingSink.record(event);
        }
    }
}
