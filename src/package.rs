//! Signed package data structures and JSON serialization.

use crate::error::{Result, SignError};
use crate::hash::HashAlgorithm;
use crate::keys::{KEY_SIZE_BITS, KEY_TYPE};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// The current version of the signed package format.
pub const FORMAT_VERSION: &str = "1.0";

fn default_version() -> String {
    FORMAT_VERSION.to_string()
}

/// The JSON document returned by `/sign` and submitted to `/verify`.
///
/// Every field has a default so that partial packages still parse and can
/// be rejected with a precise reason by the verifier. Unknown properties
/// are kept in `extra` and written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedPackage {
    /// Format version for compatibility.
    #[serde(default = "default_version")]
    pub version: String,

    /// The user whose key produced `signature`.
    #[serde(default)]
    pub user_id: String,

    /// Ed25519 signature over the signing digest (base64 encoded).
    #[serde(default)]
    pub signature: String,

    /// The signer's public key at signing time (base64 encoded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    /// Hash of the document (lowercase hex).
    #[serde(default)]
    pub document_hash: String,

    /// When the package was signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    pub signing_info: SigningInfo,

    #[serde(default)]
    pub metadata: DocumentMetadata,

    /// Properties this crate does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// How the package was signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningInfo {
    /// Hash algorithm name, see [`HashAlgorithm::name`].
    pub algorithm: String,
    pub signature_type: String,
    pub key_type: String,
    pub key_size: u32,
    pub signature_format: String,
}

impl Default for SigningInfo {
    fn default() -> Self {
        Self::for_algorithm(HashAlgorithm::default())
    }
}

impl SigningInfo {
    /// Signing info for this crate's Ed25519 keys and the given hash.
    pub fn for_algorithm(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm: algorithm.name().to_string(),
            signature_type: "Digital Signature".to_string(),
            key_type: KEY_TYPE.to_string(),
            key_size: KEY_SIZE_BITS,
            signature_format: KEY_TYPE.to_string(),
        }
    }
}

/// Facts about the uploaded document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMetadata {
    pub original_filename: Option<String>,
    pub content_type: Option<String>,
    pub file_size: u64,
}

impl SignedPackage {
    /// The hash algorithm named by `signing_info`.
    pub fn algorithm(&self) -> Result<HashAlgorithm> {
        self.signing_info.algorithm.parse()
    }

    /// Decode the package signature.
    pub fn signature_bytes(&self) -> Result<[u8; 64]> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(self.signature.trim())?;
        bytes.as_slice().try_into().map_err(|_| {
            SignError::InvalidFormat(format!(
                "Invalid signature length: expected 64, got {}",
                bytes.len()
            ))
        })
    }

    /// Save the package to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load a package from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read(path)?;
        Self::from_slice(&content)
    }

    /// Parse a package from JSON bytes.
    pub fn from_slice(json: &[u8]) -> Result<Self> {
        let package: Self = serde_json::from_slice(json)?;
        Ok(package)
    }

    /// Parse a package from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_slice(json.as_bytes())
    }

    /// Serialize the package to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(json)
    }

    /// Serialize the package to a JSON value.
    pub fn to_value(&self) -> Result<Value> {
        let value = serde_json::to_value(self)?;
        Ok(value)
    }
}

/// File name used when archiving a user's signed package.
pub fn archive_file_name(user_id: &str) -> String {
    format!("signed_document_{}.json", user_id)
}
