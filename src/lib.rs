//! # credential-core
//!
//! Encryption, validation and header-safe transport of AI provider
//! credentials.
//!
//! The crate sits between the settings UI, the storage layer and the
//! provider HTTP clients:
//! - **On store**: clean the pasted key, validate its provider format, encrypt it
//! - **On read**: turn the stored form back into the key, tolerating legacy rows
//! - **On request**: build sanitized auth headers from the key
//!
//! ## Security Design
//!
//! - AES-256-GCM with a fresh random IV per encryption
//! - Key material held in `secrecy` wrappers, derived keys zeroized on drop
//! - Plaintext storage only in development builds, always `PLAIN:`-tagged
//! - Double-encrypted keys are rejected before any key is derived
//! - Diagnostics carry at most a four-character preview of a secret

pub mod labels;
pub mod errors;
pub mod observer;
pub mod config;
pub mod keys;
pub mod cipher;
pub mod policy;
pub mod codec;
pub mod registry;
pub mod sanitize;
pub mod facade;

// Re-export core types
pub use codec::{parse_stored_form, SecretCodec, StoredForm};
pub use config::{CredentialConfig, RuntimeContext};
pub use errors::{ConfigError, CredentialError};
pub use facade::{mask_secret, CredentialFacade, ProviderRecord, RetrievedCredential};
pub use keys::KeyMaterial;
pub use observer::{CredentialEvent, DiagnosticSink, NoopSink, RecordingSink, TracingSink};
pub use policy::CodecMode;
pub use registry::{ProviderKind, ValidationVerdict};
pub use sanitize::{sanitize_header_map, sanitize_secret, HeaderSanitization, SanitizationResult};
