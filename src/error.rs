//! Error types for the docsign library.

use thiserror::Error;

/// The main error type for docsign operations.
#[derive(Error, Debug)]
pub enum SignError {
    /// Error reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error with JSON serialization/deserialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error with base64 encoding/decoding.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Error with Ed25519 signature operations.
    #[error("Signature error: {0}")]
    Signature(#[from] ed25519_dalek::SignatureError),

    /// Transport or response decoding failure in the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid key format or length.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// User id that cannot name a key directory.
    #[error("Invalid user id: {0:?}")]
    InvalidUserId(String),

    /// No key pair has been provisioned for this user.
    #[error("Keys not found for user {0}")]
    UserNotFound(String),

    /// A key pair already exists for this user.
    #[error("User {0} already has keys")]
    KeysExist(String),

    /// The signed package carries no document hash.
    #[error("Document hash not found in signed package")]
    MissingDocumentHash,

    /// Document hash mismatch.
    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    /// Invalid signature or package format.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Result type alias for docsign operations.
pub type Result<T> = std::result::Result<T, SignError>;
