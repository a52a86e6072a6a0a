use std::path::PathBuf;

use pwcrypt_crypto::{AuthFailure, CryptoError};
use thiserror::Error;

pub type PwcryptResult<T> = Result<T, PwcryptError>;

#[derive(Debug, Error)]
pub enum PwcryptError {
    #[error("input not found: {}", .0.display())]
    InputMissing(PathBuf),

    #[error("input and output are the same file: {}", .0.display())]
    SamePath(PathBuf),

    #[error("{} is a directory: directories must go through the archiver", .0.display())]
    Directory(PathBuf),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("operation declined by user")]
    Declined,

    #[error("archive error: {0}")]
    Archive(String),

    #[error("config error: {0}")]
    Config(String),
}

impl PwcryptError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// The user chose not to continue. Not a failure; callers should report
    /// it without an error banner.
    pub fn is_declined(&self) -> bool {
        matches!(self, Self::Declined)
    }

    /// Header validation failed: almost always a wrong passphrase.
    pub fn is_wrong_passphrase(&self) -> bool {
        matches!(self, Self::Crypto(CryptoError::Auth(AuthFailure::Header)))
    }
}
