//! Server configuration.

use crate::hash::HashAlgorithm;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default request body limit: 10 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Configuration for running a [`crate::SignServer`].
///
/// Every flag can also be given through its `DOCSIGN_*` environment
/// variable.
#[derive(clap::Parser, Debug, Clone)]
#[command(name = "docsign-server", version, about = "Document signing service")]
pub struct Config {
    /// The address at which to listen.
    #[arg(long, env = "DOCSIGN_LISTEN", default_value = "127.0.0.1:8000")]
    pub listen: SocketAddr,

    /// Directory holding one sub-directory of key files per user.
    #[arg(long, env = "DOCSIGN_KEYS_DIR", default_value = "keys/users")]
    pub keys_dir: PathBuf,

    /// When set, every signed package is also written to
    /// `<archive_dir>/signed_document_<user_id>.json`.
    #[arg(long, env = "DOCSIGN_ARCHIVE_DIR")]
    pub archive_dir: Option<PathBuf>,

    /// Hash algorithm for newly signed packages. Verification follows
    /// whatever algorithm the submitted package names.
    #[arg(long, env = "DOCSIGN_ALGORITHM", value_enum, default_value_t = HashAlgorithm::Sha256)]
    pub algorithm: HashAlgorithm,

    /// Largest accepted request body in bytes.
    #[arg(long, env = "DOCSIGN_MAX_BODY_SIZE", default_value_t = DEFAULT_MAX_BODY_SIZE)]
    pub max_body_size: usize,

    /// Emit logs as JSON lines.
    #[arg(long, env = "DOCSIGN_LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    /// A config suitable for testing: ephemeral localhost port, keys under
    /// `keys_dir`, no archive.
    pub fn testing<P: Into<PathBuf>>(keys_dir: P) -> Self {
        Self {
            listen: (std::net::Ipv4Addr::LOCALHOST, 0).into(),
            keys_dir: keys_dir.into(),
            archive_dir: None,
            algorithm: HashAlgorithm::Sha256,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            log_json: false,
        }
    }
}
