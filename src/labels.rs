//! Authoritative constants shared with the web client and the storage layer.
//!
//! Stored credentials written by older clients are read back through these
//! values, so changing any of them breaks access to existing data.
//!
//! RULES:
//! 1. NEVER use raw string literals for tags or format labels; use the constants here
//! 2. Format labels are rendered by the settings UI; keep them stable
//! 3. These MUST match the values the browser client writes

// --- Stored Form Tags ---

/// Prefix marking a credential stored without encryption (development fallback)
pub const PLAIN_PREFIX: &str = "PLAIN:";

/// Bare provider prefixes accepted as already-plaintext legacy values.
///
/// Longest first so `sk-ant-` is never reported as `sk-`.
pub const LEGACY_PROVIDER_PREFIXES: [&str; 4] = ["sk-ant-", "sk-", "xai-", "AIza"];

// --- Envelope Layout ---

/// AES-GCM IV length in bytes
pub const IV_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes
pub const TAG_LEN: usize = 16;

/// Shortest base64 string that can hold an IV and a tag
pub const MIN_ENVELOPE_B64_LEN: usize = 40;

// --- Corruption Signature ---

/// Leading characters of a credential that went through the encrypt path twice
pub const CORRUPTION_PREFIX: &str = "Icyh";

/// Minimum length at which the corruption prefix is treated as the artifact
pub const CORRUPTION_MIN_LEN: usize = 128;

// --- Format Labels ---

pub const FORMAT_OPENAI: &str = "openai";
pub const FORMAT_ANTHROPIC: &str = "anthropic";
pub const FORMAT_GOOGLE: &str = "google";
pub const FORMAT_GROK_MODERN: &str = "grok_modern";
pub const FORMAT_GROK_LEGACY: &str = "grok_legacy";
pub const FORMAT_GENERIC: &str = "generic";
pub const FORMAT_CORRUPTED: &str = "corrupted";
pub const FORMAT_UNKNOWN: &str = "unknown";

// --- Sanitization ---

/// Shortest credential worth sending to a provider
pub const MIN_SECRET_LEN: usize = 10;

/// Header allowed to carry an empty value
pub const EMPTY_VALUE_HEADER: &str = "content-length";

// --- Masking ---

/// Fixed bullet run used by the display mask; never proportional to length
pub const MASK_BULLETS: &str = "••••••••";

/// Characters shown at each end of a masked secret
pub const MASK_EDGE: usize = 4;

/// Characters of a secret that may appear in diagnostics
pub const LOG_PREVIEW_LEN: usize = 4;
