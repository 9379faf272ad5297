//! Signature verification and verification reports.

use crate::error::{Result, SignError};
use crate::hash::{hash_bytes, signing_digest, DocumentHash, HashAlgorithm};
use crate::key_store::UserKeyStore;
use crate::keys::PublicKey;
use crate::package::{DocumentMetadata, SignedPackage, SigningInfo};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Outcome of checking one signed package against a document.
#[derive(Debug, Clone)]
pub struct VerificationResult {
    /// Whether the package signature is valid.
    pub valid: bool,

    /// The user named by the package.
    pub user_id: String,

    /// Signing time recorded in the package.
    pub timestamp: Option<DateTime<Utc>>,

    /// Hash of the document that was verified.
    pub document_hash: DocumentHash,

    pub signing_info: SigningInfo,
    pub metadata: DocumentMetadata,
}

/// Verifier for signed packages.
pub struct Verifier;

impl Verifier {
    /// Verify a package against a known public key.
    ///
    /// A signature that does not match is reported through
    /// [`VerificationResult::valid`]; everything that prevents the check
    /// from running at all is an error.
    pub fn verify(
        document: &[u8],
        package: &SignedPackage,
        signature_base64: &str,
        public_key: &PublicKey,
    ) -> Result<VerificationResult> {
        let (algorithm, document_hash) = Self::check_integrity(document, package)?;
        Self::check_signature(
            algorithm,
            document_hash,
            document,
            package,
            signature_base64,
            public_key,
        )
    }

    /// Verify a package with the public key stored for `package.user_id`.
    pub fn verify_with_store(
        document: &[u8],
        package: &SignedPackage,
        signature_base64: &str,
        store: &UserKeyStore,
    ) -> Result<VerificationResult> {
        let (algorithm, document_hash) = Self::check_integrity(document, package)?;
        let public_key = store.load_public_key(&package.user_id)?;
        Self::check_signature(
            algorithm,
            document_hash,
            document,
            package,
            signature_base64,
            &public_key,
        )
    }

    /// Quick check that a package is valid for a document.
    pub fn is_valid(
        document: &[u8],
        package: &SignedPackage,
        signature_base64: &str,
        public_key: &PublicKey,
    ) -> bool {
        Self::verify(document, package, signature_base64, public_key)
            .map(|r| r.valid)
            .unwrap_or(false)
    }

    fn check_integrity(
        document: &[u8],
        package: &SignedPackage,
    ) -> Result<(HashAlgorithm, DocumentHash)> {
        if package.document_hash.trim().is_empty() {
            return Err(SignError::MissingDocumentHash);
        }

        let algorithm = package.algorithm()?;
        let actual = hash_bytes(algorithm, document);
        if !actual.matches_hex(&package.document_hash) {
            return Err(SignError::HashMismatch {
                expected: package.document_hash.clone(),
                actual: actual.to_hex(),
            });
        }

        Ok((algorithm, actual))
    }

    fn check_signature(
        algorithm: HashAlgorithm,
        document_hash: DocumentHash,
        document: &[u8],
        package: &SignedPackage,
        signature_base64: &str,
        public_key: &PublicKey,
    ) -> Result<VerificationResult> {
        let signature_bytes =
            base64::engine::general_purpose::STANDARD.decode(signature_base64.trim())?;
        let signed = package.signature_bytes()?;

        let digest = signing_digest(algorithm, document, &signature_bytes);
        let valid = public_key.verify(digest.as_bytes(), &signed).is_ok();

        tracing::debug!(user_id = %package.user_id, valid, "checked package signature");

        Ok(VerificationResult {
            valid,
            user_id: package.user_id.clone(),
            timestamp: package.timestamp,
            document_hash,
            signing_info: package.signing_info.clone(),
            metadata: package.metadata.clone(),
        })
    }
}

/// The JSON verdict returned by `/verify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub valid: bool,
    pub message: String,
    pub details: Value,
}

impl VerificationReport {
    /// Report for a completed check, valid or not.
    pub fn from_result(result: &VerificationResult) -> Self {
        let validity = if result.valid { "Verified" } else { "Failed" };
        let mut details = json!({
            "user_id": result.user_id,
            "timestamp": result.timestamp,
            "document_hash": result.document_hash.to_hex(),
            "signing_info": result.signing_info,
            "metadata": result.metadata,
            "non_repudiation": {
                "document_integrity": "Verified",
                "signature_validity": validity,
                "timestamp": result.timestamp,
                "key_type": result.signing_info.key_type,
                "algorithm": result.signing_info.algorithm,
            }
        });

        let message = if result.valid {
            "Signature is valid"
        } else {
            details["error"] = json!("Signature mismatch");
            "Signature verification failed"
        };

        Self {
            valid: result.valid,
            message: message.to_string(),
            details,
        }
    }

    /// Report for a `signed_package` upload that is not a package at all.
    pub fn invalid_package(error: &str, received: &[u8]) -> Self {
        Self {
            valid: false,
            message: "Invalid signed package format".to_string(),
            details: json!({
                "error": error,
                "received_data": String::from_utf8_lossy(received),
            }),
        }
    }

    /// Report for a check that could not complete.
    pub fn from_error(error: &SignError, package: &SignedPackage) -> Self {
        let (message, details) = match error {
            SignError::MissingDocumentHash => (
                "Invalid signed package: missing document hash",
                json!({ "error": error.to_string() }),
            ),
            SignError::HashMismatch { expected, actual } => (
                "Document has been modified",
                json!({
                    "error": "Document hash mismatch",
                    "original_hash": expected,
                    "current_hash": actual,
                }),
            ),
            _ => (
                "Error during verification",
                json!({
                    "error": error.to_string(),
                    "user_id": package.user_id,
                    "timestamp": package.timestamp,
                }),
            ),
        };

        Self {
            valid: false,
            message: message.to_string(),
            details,
        }
    }

    /// Report for an unexpected server failure.
    pub fn internal(error: &str) -> Self {
        Self {
            valid: false,
            message: "Internal server error".to_string(),
            details: json!({ "error": error }),
        }
    }
}
