//! Document hashing for signed packages.
//!
//! Two algorithms are supported. SHA-256 is the default and is what
//! `signing_info.algorithm` names when a package does not say otherwise.

use crate::error::{Result, SignError};
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::fmt;
use std::str::FromStr;

/// The size of a document hash in bytes (both algorithms produce 32).
pub const HASH_SIZE: usize = 32;

/// Hash algorithm used for the document hash and the signing digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum HashAlgorithm {
    #[default]
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "BLAKE3")]
    Blake3,
}

impl HashAlgorithm {
    /// The name written into `signing_info.algorithm`.
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Blake3 => "BLAKE3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = SignError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SHA-256" => Ok(HashAlgorithm::Sha256),
            "BLAKE3" => Ok(HashAlgorithm::Blake3),
            other => Err(SignError::InvalidFormat(format!(
                "Unsupported hash algorithm: {}",
                other
            ))),
        }
    }
}

/// A 32 byte hash of document content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHash([u8; HASH_SIZE]);

impl DocumentHash {
    /// Create a hash from raw bytes.
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes of the hash.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Encode the hash as a lowercase hexadecimal string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Compare against a hex string, ignoring case.
    pub fn matches_hex(&self, hex: &str) -> bool {
        self.to_hex().eq_ignore_ascii_case(hex.trim())
    }
}

/// Incremental hasher over either algorithm.
enum Hasher {
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Hasher::Sha256(sha2::Sha256::new()),
            HashAlgorithm::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(h) => h.update(data),
            Hasher::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finalize(self) -> DocumentHash {
        match self {
            Hasher::Sha256(h) => DocumentHash(h.finalize().into()),
            Hasher::Blake3(h) => DocumentHash(*h.finalize().as_bytes()),
        }
    }
}

/// Compute the hash of a byte slice.
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> DocumentHash {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    hasher.finalize()
}

/// Compute the digest that gets signed: `H(document || signature_bytes)`.
pub fn signing_digest(
    algorithm: HashAlgorithm,
    document: &[u8],
    signature_bytes: &[u8],
) -> DocumentHash {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(document);
    hasher.update(signature_bytes);
    hasher.finalize()
}
