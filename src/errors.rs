//! Error types for credential-core operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Cannot encrypt an empty credential")]
    EmptyInput,

    #[error("Cryptographic primitives are unavailable in this runtime context")]
    CryptoUnavailable,

    #[error(
        "Encryption is required but unavailable: ensure the app runs over HTTPS \
         (secure context) so credentials can be encrypted before storage"
    )]
    EncryptionUnavailable,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: authentication tag mismatch")]
    DecryptionFailed,

    #[error("Invalid ciphertext: too short")]
    InvalidCiphertext,

    #[error("Invalid base64 encoding: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error(
        "API key appears to be corrupted (double-encrypted). \
         Please delete it and re-enter your API key"
    )]
    CorruptedCredential,

    #[error("Invalid {provider} API key format: {message}")]
    FormatInvalid { provider: String, message: String },

    #[error("Invalid header value: {0}")]
    HeaderValueInvalid(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Config parse error: {0}")]
    ParseError(String),
}
