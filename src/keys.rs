//! Ed25519 key generation and key file handling.

use crate::error::{Result, SignError};
use base64::Engine;
use ed25519_dalek::{Signer as DalekSigner, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::fs;
use std::path::Path;

const PRIVATE_KEY_HEADER: &str = "DOCSIGN PRIVATE KEY";
const PUBLIC_KEY_HEADER: &str = "DOCSIGN PUBLIC KEY";

/// Key size written into `signing_info.key_size`, in bits.
pub const KEY_SIZE_BITS: u32 = 256;

/// Key type written into `signing_info.key_type`.
pub const KEY_TYPE: &str = "Ed25519";

fn engine() -> &'static base64::engine::GeneralPurpose {
    &base64::engine::general_purpose::STANDARD
}

/// An Ed25519 keypair belonging to one user.
#[derive(Debug)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Create a keypair from raw secret key bytes (32 bytes).
    pub fn from_bytes(secret_bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret_bytes);
        Self { signing_key }
    }

    /// Get the secret key bytes.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    /// Sign a message and return the signature bytes.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Render the private key file contents.
    ///
    /// The format is:
    /// - Line 1: "DOCSIGN PRIVATE KEY"
    /// - Line 2: Base64-encoded secret key
    /// - Line 3: Base64-encoded public key
    pub fn to_file_contents(&self) -> String {
        format!(
            "{}\n{}\n{}\n",
            PRIVATE_KEY_HEADER,
            engine().encode(self.signing_key.to_bytes()),
            self.public_key().to_base64()
        )
    }

    /// Parse private key file contents.
    ///
    /// When the public key line is present it must match the secret key.
    pub fn from_file_contents(content: &str) -> Result<Self> {
        let lines: Vec<&str> = content.lines().collect();

        if lines.len() < 2 || lines[0] != PRIVATE_KEY_HEADER {
            return Err(SignError::InvalidKey("Invalid key file format".to_string()));
        }

        let secret_bytes = engine().decode(lines[1].trim())?;
        let arr: [u8; 32] = secret_bytes.as_slice().try_into().map_err(|_| {
            SignError::InvalidKey(format!(
                "Invalid secret key length: expected 32, got {}",
                secret_bytes.len()
            ))
        })?;
        let keypair = Self::from_bytes(&arr);

        if let Some(public_line) = lines.get(2) {
            if keypair.public_key().to_base64() != public_line.trim() {
                return Err(SignError::InvalidKey(
                    "Public key does not match secret key".to_string(),
                ));
            }
        }

        Ok(keypair)
    }

    /// Save the keypair to a file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_file_contents())?;
        Ok(())
    }

    /// Load a keypair from a file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_file_contents(&content)
    }
}

/// An Ed25519 public key for verifying signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    verifying_key: VerifyingKey,
}

impl PublicKey {
    /// Create a public key from raw bytes (32 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            SignError::InvalidKey(format!(
                "Invalid public key length: expected 32, got {}",
                bytes.len()
            ))
        })?;
        let verifying_key = VerifyingKey::from_bytes(&arr)?;
        Ok(Self { verifying_key })
    }

    /// Get the raw bytes of the public key.
    pub fn as_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Encode the public key as base64.
    pub fn to_base64(&self) -> String {
        engine().encode(self.as_bytes())
    }

    /// Decode a public key from base64.
    pub fn from_base64(s: &str) -> Result<Self> {
        let bytes = engine().decode(s)?;
        Self::from_bytes(&bytes)
    }

    /// Verify a signature on a message.
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> Result<()> {
        let sig = ed25519_dalek::Signature::from_bytes(signature);
        self.verifying_key.verify_strict(message, &sig)?;
        Ok(())
    }

    /// Serialize the public key for writing to a key file.
    pub fn to_file_contents(&self) -> String {
        format!("{}\n{}\n", PUBLIC_KEY_HEADER, self.to_base64())
    }

    /// Save the public key to a file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_file_contents())?;
        Ok(())
    }

    /// Load a public key from a file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let lines: Vec<&str> = content.lines().collect();

        if lines.len() < 2 || lines[0] != PUBLIC_KEY_HEADER {
            return Err(SignError::InvalidKey(
                "Invalid public key file format".to_string(),
            ));
        }

        Self::from_base64(lines[1].trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generate_and_sign() {
        let keypair = KeyPair::generate();
        let message = b"Test message";
        let signature = keypair.sign(message);

        let public_key = keypair.public_key();
        assert!(public_key.verify(message, &signature).is_ok());
    }

    #[test]
    fn test_wrong_message_fails() {
        let keypair = KeyPair::generate();
        let signature = keypair.sign(b"Original message");

        let public_key = keypair.public_key();
        assert!(public_key.verify(b"Different message", &signature).is_err());
    }

    #[test]
    fn test_keypair_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join("private.key");
        let pub_path = dir.path().join("public.key");

        let keypair = KeyPair::generate();
        keypair.save_to_file(&key_path).unwrap();
        keypair.public_key().save_to_file(&pub_path).unwrap();

        let loaded = KeyPair::load_from_file(&key_path).unwrap();
        assert_eq!(keypair.secret_bytes(), loaded.secret_bytes());

        let loaded_pub = PublicKey::load_from_file(&pub_path).unwrap();
        assert_eq!(keypair.public_key(), loaded_pub);
    }

    #[test]
    fn test_rejects_bad_header() {
        let err = KeyPair::from_file_contents("SOMETHING ELSE\nAAAA\n").unwrap_err();
        assert!(matches!(err, SignError::InvalidKey(_)));
    }

    #[test]
    fn test_rejects_mismatched_public_line() {
        let keypair = KeyPair::generate();
        let other = KeyPair::generate();
        let content = format!(
            "{}\n{}\n{}\n",
            PRIVATE_KEY_HEADER,
            engine().encode(keypair.secret_bytes()),
            other.public_key().to_base64()
        );
        assert!(KeyPair::from_file_contents(&content).is_err());
    }

    #[test]
    fn test_public_key_length_checked() {
        let err = PublicKey::from_bytes(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, SignError::InvalidKey(_)));
    }
}
