//! Per-provider credential format rules.
//!
//! Rules are compiled once into a static table. Provider-specific rules are
//! strict: a Grok key must carry the `xai-` prefix, a Google key the `AIza`
//! prefix, and so on. When the provider is unknown, an ordered fallback list
//! is tried and the first match wins.
//!
//! The corruption signature is checked before any rule, so a double-encrypted
//! value is never reported as a generic-but-valid key.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::CredentialError;
use crate::labels::*;

/// Providers with a dedicated format rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Google,
    Grok,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::Grok => "grok",
        }
    }

    /// Name shown to the operator in error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Google => "Google",
            Self::Grok => "Grok",
        }
    }

    /// Parse a provider identifier, returning `None` for providers without a rule.
    pub fn from_id(provider_id: &str) -> Option<Self> {
        provider_id.parse().ok()
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "google" | "vertex" | "gemini" => Ok(Self::Google),
            "grok" | "xai" => Ok(Self::Grok),
            _ => Err(format!("unknown provider '{s}'")),
        }
    }
}

/// Outcome of validating one credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationVerdict {
    pub is_valid: bool,
    pub format_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationVerdict {
    fn valid(format_label: &str) -> Self {
        Self {
            is_valid: true,
            format_label: format_label.to_string(),
            error: None,
        }
    }

    fn invalid(format_label: &str, error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            format_label: format_label.to_string(),
            error: Some(error.into()),
        }
    }

    /// Whether the credential carries the double-encryption artifact.
    pub fn is_corrupted(&self) -> bool {
        !self.is_valid && self.format_label == FORMAT_CORRUPTED
    }

    /// Convert into a `Result` for store paths that must stop on bad input.
    pub fn into_result(self, provider_id: &str) -> Result<String, CredentialError> {
        if self.is_valid {
            return Ok(self.format_label);
        }
        if self.is_corrupted() {
            return Err(CredentialError::CorruptedCredential);
        }
        Err(CredentialError::FormatInvalid {
            provider: provider_id.to_string(),
            message: self.error.unwrap_or_else(|| "format not recognized".to_string()),
        })
    }
}

/// A compiled pattern and the format label it reports.
pub struct ProviderRule {
    pub format_label: &'static str,
    pattern: Regex,
}

impl ProviderRule {
    fn new(format_label: &'static str, pattern: &str) -> Self {
        Self {
            format_label,
            pattern: Regex::new(pattern).expect("provider rule pattern is a valid regex"),
        }
    }

    pub fn matches(&self, secret: &str) -> bool {
        self.pattern.is_match(secret)
    }
}

/// The rule table.
pub struct ProviderFormatRegistry {
    openai: ProviderRule,
    anthropic: ProviderRule,
    google: ProviderRule,
    grok: ProviderRule,
    grok_legacy: ProviderRule,
    generic: ProviderRule,
}

static DEFAULT_REGISTRY: Lazy<ProviderFormatRegistry> = Lazy::new(ProviderFormatRegistry::new);

/// Validate against the process-wide registry.
pub fn validate(secret: &str, provider_id: &str) -> ValidationVerdict {
    DEFAULT_REGISTRY.validate(secret, provider_id)
}

/// Whether `secret` carries the double-encryption artifact.
pub fn is_corruption_signature(secret: &str) -> bool {
    secret.starts_with(CORRUPTION_PREFIX) && secret.chars().count() >= CORRUPTION_MIN_LEN
}

/// The bare prefix of a legacy provider key, if `value` starts with one.
pub fn known_prefix(value: &str) -> Option<&'static str> {
    LEGACY_PROVIDER_PREFIXES
        .iter()
        .copied()
        .find(|prefix| value.starts_with(prefix))
}

impl ProviderFormatRegistry {
    pub fn new() -> Self {
        Self {
            openai: ProviderRule::new(FORMAT_OPENAI, r"^sk-[A-Za-z0-9_-]+$"),
            anthropic: ProviderRule::new(FORMAT_ANTHROPIC, r"^sk-ant-[A-Za-z0-9_-]+$"),
            google: ProviderRule::new(FORMAT_GOOGLE, r"^AIza[A-Za-z0-9_-]+$"),
            grok: ProviderRule::new(FORMAT_GROK_MODERN, r"^xai-[A-Za-z0-9_-]+$"),
            grok_legacy: ProviderRule::new(FORMAT_GROK_LEGACY, r"^[A-Za-z0-9]{129}$"),
            generic: ProviderRule::new(FORMAT_GENERIC, r"^[A-Za-z0-9_-]{20,}$"),
        }
    }

    fn rule_for(&self, kind: ProviderKind) -> &ProviderRule {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Google => &self.google,
            ProviderKind::Grok => &self.grok,
        }
    }

    /// Rules tried, in order, when the provider is unknown.
    fn fallback_rules(&self) -> [&ProviderRule; 6] {
        [
            &self.grok,
            &self.grok_legacy,
            &self.openai,
            &self.google,
            &self.anthropic,
            &self.generic,
        ]
    }

    pub fn validate(&self, secret: &str, provider_id: &str) -> ValidationVerdict {
        if is_corruption_signature(secret) {
            return ValidationVerdict::invalid(
                FORMAT_CORRUPTED,
                CredentialError::CorruptedCredential.to_string(),
            );
        }

        match ProviderKind::from_id(provider_id) {
            Some(kind) => self.validate_known(secret, kind),
            None => self.validate_unknown(secret),
        }
    }

    fn validate_known(&self, secret: &str, kind: ProviderKind) -> ValidationVerdict {
        let rule = self.rule_for(kind);
        if rule.matches(secret) {
            return ValidationVerdict::valid(rule.format_label);
        }

        let expected = match kind {
            ProviderKind::OpenAi => "a key starting with 'sk-'",
            ProviderKind::Anthropic => "a key starting with 'sk-ant-'",
            ProviderKind::Google => "a key starting with 'AIza'",
            ProviderKind::Grok => "a key starting with 'xai-'",
        };
        ValidationVerdict::invalid(
            FORMAT_UNKNOWN,
            format!(
                "{} API key format not recognized. Expected {expected} followed by letters, digits, '-' or '_'",
                kind.display_name()
            ),
        )
    }

    fn validate_unknown(&self, secret: &str) -> ValidationVerdict {
        // `sk-ant-` keys also satisfy the openai pattern.
        if self.anthropic.matches(secret) {
            return ValidationVerdict::valid(self.anthropic.format_label);
        }

        self.fallback_rules()
            .into_iter()
            .find(|rule| rule.matches(secret))
            .map(|rule| ValidationVerdict::valid(rule.format_label))
            .unwrap_or_else(|| {
                ValidationVerdict::invalid(
                    FORMAT_UNKNOWN,
                    "API key format not recognized. Check that the full key was pasted",
                )
            })
    }
}

impl Default for ProviderFormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}
