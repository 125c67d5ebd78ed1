//! Cross-client interoperability and end-to-end credential lifecycle.
//!
//! The fixed envelopes below use the browser client's layout
//! (AES-GCM, key = SHA-256(seed), IV = 01..0c). They must keep decrypting,
//! otherwise every stored credential becomes unreadable.
//!
//! Run with: cargo test --test interop

use std::sync::Arc;

use credential_core::codec::is_encrypted;
use credential_core::labels::*;
use credential_core::observer::PassThroughReason;
use credential_core::registry;
use credential_core::{
    mask_secret, parse_stored_form, sanitize_header_map, CredentialError, CredentialEvent,
    CredentialFacade, KeyMaterial, NoopSink, ProviderRecord, RecordingSink, RuntimeContext,
    SecretCodec, StoredForm,
};
use serde_json::json;

/// Seed used by the browser client when generating the vectors (NEVER use in production).
const TEST_SEED: &str = "interop-test-seed";

const GROK_PLAINTEXT: &str = "xai-interop-vector-123";
const GROK_ENVELOPE: &str = "AQIDBAUGBwgJCgsM0t3HL0aGQdf0K3jg0kI7C0GJdU1Y8D4tEMvj+IJJt83sG0RkPf0=";

const ANTHROPIC_PLAINTEXT: &str = "sk-ant-REDACTED";
const ANTHROPIC_ENVELOPE: &str =
    "AQIDBAUGBwgJCgsM2deDY0GcGNP2LTj+iU42C0uJNww1iN8cGdZiT5ZitbcAyaPLy6hGKj/Dm7PPgw==";

fn codec() -> SecretCodec {
    SecretCodec::new(KeyMaterial::from(TEST_SEED), Arc::new(NoopSink))
}

#[test]
fn browser_envelopes_decrypt() {
    let codec = codec();
    let ctx = RuntimeContext::production();

    assert!(is_encrypted(GROK_ENVELOPE));
    assert_eq!(codec.decrypt(GROK_ENVELOPE, &ctx), GROK_PLAINTEXT);
    assert_eq!(codec.decrypt(ANTHROPIC_ENVELOPE, &ctx), ANTHROPIC_PLAINTEXT);

    match parse_stored_form(GROK_ENVELOPE) {
        StoredForm::Encrypted(envelope) => {
            assert_eq!(envelope.iv, [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
            assert_eq!(envelope.ciphertext.len(), GROK_PLAINTEXT.len() + TAG_LEN);
        }
        other => panic!("expected an envelope, got {other:?}"),
    }
}

/// Rows the browser client writes besides envelopes: the development
/// fallback tag and the double-encryption artifact the settings UI flags.
#[test]
fn browser_tags_are_recognized() {
    let plain_row = "PLAIN:xai-interop-vector-123";
    assert_eq!(parse_stored_form(plain_row), StoredForm::Plain(GROK_PLAINTEXT.to_string()));
    assert_eq!(codec().decrypt(plain_row, &RuntimeContext::production()), GROK_PLAINTEXT);

    let doubled = format!("Icyh{}", "A".repeat(124));
    let verdict = registry::validate(&doubled, "openai");
    assert!(verdict.is_corrupted());
    assert_eq!(verdict.format_label, "corrupted");

    let just_short = format!("Icyh{}", "A".repeat(123));
    assert!(!registry::validate(&just_short, "openai").is_corrupted());
}

#[test]
fn rust_envelopes_use_browser_layout() {
    let codec = codec();
    let ctx = RuntimeContext::production();
    let stored = codec.encrypt(GROK_PLAINTEXT, &ctx).unwrap();

    // Same plaintext and key, fresh IV: same length, different bytes.
    assert_eq!(stored.len(), GROK_ENVELOPE.len());
    assert_ne!(stored, GROK_ENVELOPE);
    assert_eq!(codec.decrypt(&stored, &ctx), GROK_PLAINTEXT);
}

#[test]
fn wrong_seed_leaves_envelope_untouched() {
    let sink = Arc::new(RecordingSink::new());
    let codec = SecretCodec::new(KeyMaterial::from("some-other-seed"), sink.clone());
    let read = codec.decrypt(GROK_ENVELOPE, &RuntimeContext::production());
    assert_eq!(read, GROK_ENVELOPE);
    assert!(sink.events().iter().any(|e| matches!(
        e,
        CredentialEvent::DecryptPassThrough {
            reason: PassThroughReason::DecryptionFailed,
            ..
        }
    )));
}

#[test]
fn full_lifecycle_in_production() {
    let sink = Arc::new(RecordingSink::new());
    let facade = CredentialFacade::new(KeyMaterial::from(TEST_SEED), sink.clone());
    let ctx = RuntimeContext::production();

    // User pastes a key with a trailing newline.
    let stored = facade
        .prepare_for_storage("xai-abc123def456\n", "grok", &ctx)
        .unwrap();
    assert!(is_encrypted(&stored));

    // Storage layer hands back a decrypted view with a stale config key.
    let record: ProviderRecord = serde_json::from_value(json!({
        "provider_type": "grok",
        "decrypted_api_key": facade.reveal(&stored, &ctx),
        "config": { "api_key": "xai-stale-value" },
    }))
    .unwrap();

    let retrieved = facade.retrieve_credential_safe(&record);
    assert!(retrieved.is_valid);
    assert_eq!(retrieved.secret, "xai-abc123def456");
    assert_eq!(mask_secret(&retrieved.secret), format!("xai-{MASK_BULLETS}f456"));

    let headers = facade.auth_headers("grok", &retrieved.secret).unwrap();
    assert_eq!(headers["Authorization"], "Bearer xai-abc123def456");

    let dump = format!("{:?}", sink.events());
    assert!(!dump.contains("abc123def456"));
    assert!(!dump.contains("stale-value"));
}

#[test]
fn development_fallback_lifecycle() {
    let facade = CredentialFacade::new(KeyMaterial::from(TEST_SEED), Arc::new(NoopSink));
    let ctx = RuntimeContext::insecure_development();

    let stored = facade.prepare_for_storage("sk-proj-abcdef", "openai", &ctx).unwrap();
    assert!(stored.starts_with(PLAIN_PREFIX));
    assert_eq!(facade.reveal(&stored, &ctx), "sk-proj-abcdef");
}

#[test]
fn production_without_crypto_refuses_to_store() {
    let facade = CredentialFacade::new(KeyMaterial::from(TEST_SEED), Arc::new(NoopSink));
    let ctx = RuntimeContext {
        has_crypto_capability: false,
        is_secure_context: false,
        is_development_build: false,
    };
    let err = facade
        .prepare_for_storage("sk-proj-abcdef", "openai", &ctx)
        .unwrap_err();
    assert!(matches!(err, CredentialError::EncryptionUnavailable));
    assert!(err.to_string().contains("HTTPS"));
}

#[test]
fn corrupted_and_malformed_keys_get_distinct_messages() {
    let facade = CredentialFacade::new(KeyMaterial::from(TEST_SEED), Arc::new(NoopSink));
    let ctx = RuntimeContext::production();

    let corrupted = format!("{CORRUPTION_PREFIX}{}", "x".repeat(CORRUPTION_MIN_LEN));
    let a = facade.prepare_for_storage(&corrupted, "openai", &ctx).unwrap_err();
    let b = facade.prepare_for_storage("AIzaSyAbcdef", "openai", &ctx).unwrap_err();
    assert!(matches!(a, CredentialError::CorruptedCredential));
    assert!(matches!(b, CredentialError::FormatInvalid { .. }));
    assert_ne!(a.to_string(), b.to_string());
}

#[test]
fn header_map_from_client_json() {
    let headers = json!({
        "Content-Type": "application/json",
        "Authorization": "Bearer xai-abc\r\n123",
        "X-Trace": null,
    });
    let result = sanitize_header_map(headers.as_object().unwrap());
    assert!(!result.valid);
    assert_eq!(result.errors.len(), 2);
    assert_eq!(result.headers["Authorization"], "Bearer xai-abc123");
    assert_eq!(result.headers["Content-Type"], "application/json");
    assert!(!result.headers.contains_key("X-Trace"));

    let serialized = serde_json::to_value(&result).unwrap();
    assert_eq!(serialized["valid"], false);
}
