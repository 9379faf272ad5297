//! # docsign
//!
//! A document signing service and its HTTP client.
//!
//! The server keeps one Ed25519 key pair per user, signs uploaded documents
//! into JSON *signed packages*, and verifies packages against documents.
//! The client makes the three matching HTTP calls.
//!
//! ## Features
//!
//! - **Per-user keys** stored on disk, provisioned once per user
//! - **SHA-256 or BLAKE3** document hashing
//! - **Signed packages** with timestamp, signing info and upload metadata
//! - **Verification reports** that separate tampering from bad signatures
//!
//! ## Signing in-process
//!
//! ```rust
//! use docsign::{KeyPair, Signer, Verifier};
//!
//! let keypair = KeyPair::generate();
//! let document = b"Important document content";
//! // base64 of the caller's own signature bytes, e.g. a drawn signature
//! let signature = "VGVzdCBTaWduYXR1cmU=";
//!
//! let package = Signer::new(&keypair)
//!     .with_user_id("alice")
//!     .sign(document, signature)
//!     .unwrap();
//!
//! let result = Verifier::verify(document, &package, signature, &keypair.public_key()).unwrap();
//! assert!(result.valid);
//! ```
//!
//! ## Talking to a server
//!
//! ```no_run
//! use docsign::{Document, SignClient};
//!
//! # async fn run() -> docsign::Result<()> {
//! let client = SignClient::new("http://localhost:8000")?;
//! client.generate_keys("alice").await?;
//!
//! let document = Document::from("contract text").with_filename("contract.txt");
//! let package = client
//!     .sign_document("alice", document.clone(), "VGVzdCBTaWduYXR1cmU=")
//!     .await?;
//!
//! let verdict = client
//!     .verify_signature(document, &package, "VGVzdCBTaWduYXR1cmU=")
//!     .await?;
//! println!("{}", verdict["valid"]);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod hash;
pub mod key_store;
pub mod keys;
pub mod package;
pub mod server;
pub mod signer;
pub mod verifier;

// Re-export main types for convenience
pub use client::{Document, SignClient};
pub use config::Config;
pub use error::{Result, SignError};
pub use hash::{hash_bytes, signing_digest, DocumentHash, HashAlgorithm};
pub use key_store::UserKeyStore;
pub use keys::{KeyPair, PublicKey};
pub use package::{DocumentMetadata, SignedPackage, SigningInfo};
pub use server::{router, AppState, SignServer};
pub use signer::{sign_document, Signer};
pub use verifier::{VerificationReport, VerificationResult, Verifier};
