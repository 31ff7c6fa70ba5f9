//! Common error types for resivault.

use thiserror::Error;

/// Top-level error type for resivault operations.
///
/// Decryption failures are deliberately reported as a single
/// [`Error::CryptoFailure`] whether the key was wrong or the ciphertext was
/// damaged.
#[derive(Debug, Error)]
pub enum Error {
    /// The backing medium failed to read or write.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The vault has never been initialized.
    #[error("Root entry not found - cannot open vault. Not initialized?")]
    RootEntryNotFound,

    /// The root entry exists but is structurally inconsistent.
    #[error("Root entry malformed: {0}")]
    RootEntryMalformed(String),

    /// The stored cryptographic settings cannot be handled by this build.
    #[error("Cannot open vault - incompatible cryptographic settings: {0}")]
    CryptographyIncompatible(String),

    /// Authentication or decryption failed.
    #[error("Encryption/decryption failed - wrong key or password?")]
    CryptoFailure,

    /// Cryptographic misconfiguration, e.g. a key of the wrong size.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Operation requires an unlocked vault.
    #[error("Vault not unlocked")]
    VaultNotUnlocked,

    /// A root entry already exists.
    #[error("Vault already initialized")]
    VaultAlreadyInitialized,

    /// No entry with this id in storage or in the cache.
    #[error("Vault entry {0} not found")]
    EntryNotFound(String),

    /// No secret with this label on the entry.
    #[error("Secret {0} not found")]
    SecretNotFound(String),

    /// Secret type tag was never registered.
    #[error("Secret type {0} not supported")]
    SecretTypeNotSupported(String),

    /// Usage type tag was never registered.
    #[error("Usage type {0} not supported")]
    UsageTypeNotSupported(String),

    /// An entry already holds a secret with this label.
    #[error("Secret label {0} already exists")]
    SecretLabelAlreadyExists(String),

    /// A value did not match the schema of its variant.
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Request carried no valid session token.
    #[error("Unauthorized")]
    Unauthorized,

    /// An empty password was supplied.
    #[error("Password not provided")]
    PasswordNotProvided,
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
