//! Filesystem store of per-user key pairs.
//!
//! Layout: `<root>/<user_id>/private.key` and `<root>/<user_id>/public.key`.
//! A user exists once `private.key` is present; it holds the whole pair.

use crate::error::{Result, SignError};
use crate::keys::{KeyPair, PublicKey};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const PRIVATE_KEY_FILE: &str = "private.key";
const PUBLIC_KEY_FILE: &str = "public.key";

/// Longest accepted user id.
pub const MAX_USER_ID_LEN: usize = 128;

/// Check that a user id can safely name a directory under the store root.
pub fn validate_user_id(user_id: &str) -> Result<()> {
    let valid = !user_id.is_empty()
        && user_id.len() <= MAX_USER_ID_LEN
        && user_id != "."
        && user_id != ".."
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '@'));

    if valid {
        Ok(())
    } else {
        Err(SignError::InvalidUserId(user_id.to_string()))
    }
}

/// Write `contents` to a fresh temp file in `dir` and sync it.
fn write_temp(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(format!(".{}.{:016x}.tmp", name, rand::random::<u64>()));
    let written = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .and_then(|mut file| {
            file.write_all(contents.as_bytes())?;
            file.sync_all()
        });
    if let Err(e) = written {
        let _ = fs::remove_file(&path);
        return Err(e.into());
    }
    Ok(path)
}

fn publish_public_key(dir: &Path, public_path: &Path, public_key: &PublicKey) -> Result<()> {
    let staged = write_temp(dir, PUBLIC_KEY_FILE, &public_key.to_file_contents())?;
    if let Err(e) = fs::rename(&staged, public_path) {
        let _ = fs::remove_file(&staged);
        return Err(e.into());
    }
    Ok(())
}

/// Per-user key pairs kept on disk.
#[derive(Debug, Clone)]
pub struct UserKeyStore {
    root: PathBuf,
}

impl UserKeyStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn paths(&self, user_id: &str) -> Result<(PathBuf, PathBuf)> {
        validate_user_id(user_id)?;
        let user_dir = self.root.join(user_id);
        Ok((
            user_dir.join(PRIVATE_KEY_FILE),
            user_dir.join(PUBLIC_KEY_FILE),
        ))
    }

    /// Generate a key pair for a user and return the (private, public) paths.
    ///
    /// The private key is published last, with an exclusive hard link from a
    /// fully written temp file, so a present `private.key` is always complete.
    ///
    /// Fails with [`SignError::KeysExist`] when the user already has keys.
    pub fn generate_user_keys(&self, user_id: &str) -> Result<(PathBuf, PathBuf)> {
        let (private_path, public_path) = self.paths(user_id)?;
        if private_path.exists() {
            return Err(SignError::KeysExist(user_id.to_string()));
        }

        let user_dir = self.root.join(user_id);
        fs::create_dir_all(&user_dir)?;

        let keypair = KeyPair::generate();
        let staged = write_temp(&user_dir, PRIVATE_KEY_FILE, &keypair.to_file_contents())?;
        let claimed = fs::hard_link(&staged, &private_path);
        let _ = fs::remove_file(&staged);
        match claimed {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(SignError::KeysExist(user_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        // a failure here leaves private.key alone, and get_user_keys restores
        // the public half from it
        publish_public_key(&user_dir, &public_path, &keypair.public_key())?;

        tracing::info!(%user_id, "generated user key pair");
        Ok((private_path, public_path))
    }

    /// Get the (private, public) key paths for a user.
    ///
    /// A user is known once `private.key` exists. A missing `public.key` is
    /// rewritten from the private key file.
    pub fn get_user_keys(&self, user_id: &str) -> Result<(PathBuf, PathBuf)> {
        let (private_path, public_path) = self.paths(user_id)?;
        if !private_path.exists() {
            return Err(SignError::UserNotFound(user_id.to_string()));
        }
        if !public_path.exists() {
            tracing::warn!(%user_id, "public key missing, restoring from private key");
            let keypair = KeyPair::load_from_file(&private_path)?;
            publish_public_key(&self.root.join(user_id), &public_path, &keypair.public_key())?;
        }
        Ok((private_path, public_path))
    }

    /// Check if a user has generated keys.
    pub fn user_exists(&self, user_id: &str) -> bool {
        self.get_user_keys(user_id).is_ok()
    }

    /// Load a user's signing key pair.
    pub fn load_keypair(&self, user_id: &str) -> Result<KeyPair> {
        let (private_path, _) = self.get_user_keys(user_id)?;
        KeyPair::load_from_file(private_path)
    }

    /// Load a user's public key.
    pub fn load_public_key(&self, user_id: &str) -> Result<PublicKey> {
        let (_, public_path) = self.get_user_keys(user_id)?;
        PublicKey::load_from_file(public_path)
    }
}
