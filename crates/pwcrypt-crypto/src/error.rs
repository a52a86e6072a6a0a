use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Failures of the key derivation, framing, and stream layers.
///
/// `Auth` covers both a wrong passphrase and tampered data: the two cannot be
/// told apart cryptographically. `Format` means the container is structurally
/// wrong (too short, or ending before the final marker). `Resource` is only
/// for Argon2id failing to get its parameters or working memory.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("format error: {0}")]
    Format(String),

    #[error("authentication failed: {0}")]
    Auth(AuthFailure),

    #[error("key derivation resources unavailable: {0}")]
    Resource(String),

    #[error("cipher failure: {0}")]
    Cipher(String),

    #[error("stream already finalized")]
    Finalized,
}

impl CryptoError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }
}

/// Where authentication failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    /// The stream header does not match the derived key.
    #[error("invalid header: wrong key or corrupted file")]
    Header,

    /// A chunk failed its tag check after the header was accepted.
    #[error("corrupted chunk or wrong key")]
    Chunk,
}
