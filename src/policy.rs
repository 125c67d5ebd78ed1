//! Strict-versus-fallback decision for storing credentials.

use crate::config::RuntimeContext;

/// How an encrypt call is allowed to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecMode {
    /// Real AES-GCM encryption.
    Strict,
    /// `PLAIN:`-tagged plaintext, development builds only.
    Fallback,
    /// No crypto and not a development build: refuse to store.
    Reject,
}

impl CodecMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Fallback => "fallback",
            Self::Reject => "reject",
        }
    }
}

/// Decide the mode for one encrypt call.
///
/// Real encryption wins whenever it is available. Without it, only a
/// development build may store plaintext. `is_secure_context` is accepted for
/// the diagnostic record; it influences the outcome through
/// `has_crypto_capability`.
pub fn resolve(
    has_crypto_capability: bool,
    _is_secure_context: bool,
    is_development_build: bool,
) -> CodecMode {
    if has_crypto_capability {
        CodecMode::Strict
    } else if is_development_build {
        CodecMode::Fallback
    } else {
        CodecMode::Reject
    }
}

pub fn resolve_for(ctx: &RuntimeContext) -> CodecMode {
    resolve(
        ctx.has_crypto_capability,
        ctx.is_secure_context,
        ctx.is_development_build,
    )
}

/// Whether a failed strict encryption may degrade to the fallback form.
pub fn allows_fallback(ctx: &RuntimeContext) -> bool {
    ctx.is_development_build
}
