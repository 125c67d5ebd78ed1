//! Runtime context and environment-driven configuration.
//!
//! The codec never reads the environment on its own. Callers build a
//! [`RuntimeContext`] (directly, or through [`CredentialConfig::from_env`])
//! and pass it into every encrypt/decrypt call.

use secrecy::SecretString;

use crate::errors::ConfigError;
use crate::keys::KeyMaterial;

/// Environment variable holding the key-material seed.
pub const ENV_KEY_MATERIAL: &str = "CREDENTIAL_KEY_MATERIAL";
/// Environment variable overriding the development-build flag.
pub const ENV_DEVELOPMENT_BUILD: &str = "CREDENTIAL_DEVELOPMENT_BUILD";
/// Environment variable reporting whether the host serves over a secure transport.
pub const ENV_SECURE_CONTEXT: &str = "CREDENTIAL_SECURE_CONTEXT";

/// Facts about the hosting runtime that drive the fallback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeContext {
    pub has_crypto_capability: bool,
    pub is_secure_context: bool,
    pub is_development_build: bool,
}

impl RuntimeContext {
    /// Secure production context with working crypto.
    pub fn production() -> Self {
        Self {
            has_crypto_capability: true,
            is_secure_context: true,
            is_development_build: false,
        }
    }

    /// Local development over plain HTTP: crypto disabled, fallback allowed.
    pub fn insecure_development() -> Self {
        Self {
            has_crypto_capability: false,
            is_secure_context: false,
            is_development_build: true,
        }
    }

    /// Probe the platform and combine the result with the host-supplied flags.
    ///
    /// Crypto counts as available only inside a secure context and when the
    /// OS random source answers.
    pub fn detect(is_secure_context: bool, is_development_build: bool) -> Self {
        let mut probe = [0u8; 1];
        let rng_available = getrandom::getrandom(&mut probe).is_ok();
        Self {
            has_crypto_capability: is_secure_context && rng_available,
            is_secure_context,
            is_development_build,
        }
    }
}

/// Everything the codec needs, loaded once at startup.
pub struct CredentialConfig {
    pub key_material: KeyMaterial,
    pub runtime: RuntimeContext,
}

impl std::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("key_material", &"[REDACTED]")
            .field("runtime", &self.runtime)
            .finish()
    }
}

impl CredentialConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key))
    }

    /// Build the config from an arbitrary variable source.
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let seed = required_var(&lookup, ENV_KEY_MATERIAL)?;
        let is_development_build =
            parse_optional_var(&lookup, ENV_DEVELOPMENT_BUILD, cfg!(debug_assertions))?;
        let is_secure_context = parse_optional_var(&lookup, ENV_SECURE_CONTEXT, true)?;

        Ok(Self {
            key_material: KeyMaterial::new(SecretString::from(seed)),
            runtime: RuntimeContext::detect(is_secure_context, is_development_build),
        })
    }
}

// Helper functions

fn required_var<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    optional_var(lookup, key)?.ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn optional_var<F>(lookup: &F, key: &str) -> Result<Option<String>, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    match lookup(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!("failed to read {key}: {e}"))),
    }
}

fn parse_optional_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_var(lookup, key)?
        .map(|s| {
            s.trim().to_ascii_lowercase().parse().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            })
        })
        .transpose()
        .map(|opt| opt.unwrap_or(default))
}
