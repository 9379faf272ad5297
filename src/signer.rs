//! Document signing functionality.

use crate::error::Result;
use crate::hash::{hash_bytes, signing_digest, HashAlgorithm};
use crate::keys::KeyPair;
use crate::package::{DocumentMetadata, SignedPackage, SigningInfo, FORMAT_VERSION};
use base64::Engine;
use chrono::Utc;
use serde_json::Map;

/// A builder for creating signed packages.
#[derive(Debug)]
pub struct Signer<'a> {
    keypair: &'a KeyPair,
    user_id: String,
    algorithm: HashAlgorithm,
    filename: Option<String>,
    content_type: Option<String>,
}

impl<'a> Signer<'a> {
    /// Create a new signer with the given keypair.
    pub fn new(keypair: &'a KeyPair) -> Self {
        Self {
            keypair,
            user_id: String::new(),
            algorithm: HashAlgorithm::default(),
            filename: None,
            content_type: None,
        }
    }

    /// Set the user the keypair belongs to.
    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Set the hash algorithm.
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Record the uploaded file name in the package metadata.
    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Record the uploaded content type in the package metadata.
    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sign `document` bound to the caller's base64 signature value.
    pub fn sign(&self, document: &[u8], signature_base64: &str) -> Result<SignedPackage> {
        let engine = base64::engine::general_purpose::STANDARD;
        let signature_bytes = engine.decode(signature_base64.trim())?;

        let digest = signing_digest(self.algorithm, document, &signature_bytes);
        let signed = self.keypair.sign(digest.as_bytes());

        Ok(SignedPackage {
            version: FORMAT_VERSION.to_string(),
            user_id: self.user_id.clone(),
            signature: engine.encode(signed),
            public_key: Some(self.keypair.public_key().to_base64()),
            document_hash: hash_bytes(self.algorithm, document).to_hex(),
            timestamp: Some(Utc::now()),
            signing_info: SigningInfo::for_algorithm(self.algorithm),
            metadata: DocumentMetadata {
                original_filename: self.filename.clone(),
                content_type: self.content_type.clone(),
                file_size: document.len() as u64,
            },
            extra: Map::new(),
        })
    }
}

/// Convenience function to sign a document with a keypair.
pub fn sign_document(
    keypair: &KeyPair,
    user_id: &str,
    document: &[u8],
    signature_base64: &str,
) -> Result<SignedPackage> {
    Signer::new(keypair)
        .with_user_id(user_id)
        .sign(document, signature_base64)
}
