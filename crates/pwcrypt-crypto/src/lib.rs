//! pwcrypt-crypto: passphrase-based streaming file encryption
//!
//! Container layout (bytes, in order):
//! ```text
//! Salt (16) ‖ StreamHeader (40) ‖ Chunk₀ ‖ Chunk₁ ‖ … ‖ Chunkₙ (final)
//! ```
//!
//! Key schedule:
//! ```text
//! Passphrase + Salt ──Argon2id (interactive)──► SymmetricKey (256-bit)
//!   └── Stream subkey (HKDF-SHA256, salt = header nonce, info = "pwcrypt-stream-v1")
//!       ├── Header check: XChaCha20-Poly1305 tag over an empty message
//!       └── Chunk AEAD: XChaCha20-Poly1305 (nonce = 0^16 ‖ be64(index), AAD = previous tag)
//! ```
//!
//! Each chunk carries an encrypted one-byte type marker (message or final).
//! There is no length field: a stream ends only where the final-tagged chunk
//! says it does.

pub mod container;
pub mod error;
pub mod kdf;
pub mod stream;

pub use container::{
    decrypt, decrypt_chunks, encrypt, encrypt_chunks, read_header, write_header, StreamSummary,
};
pub use error::{AuthFailure, CryptoError, CryptoResult};
pub use kdf::{derive_key, KdfParams, Salt, SymmetricKey};
pub use stream::{init_pull, init_push, ChunkTag, PullStream, PushStream, StreamHeader};

/// Size of a symmetric key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an Argon2id salt in bytes
pub const SALT_SIZE: usize = 16;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of the stream header: header nonce followed by the key-check tag
pub const HEADER_SIZE: usize = NONCE_SIZE + TAG_SIZE;

/// Maximum plaintext bytes per chunk
pub const CHUNK_SIZE: usize = 4096;

/// Bytes added to every chunk on the wire: type marker + Poly1305 tag
pub const CHUNK_OVERHEAD: usize = 1 + TAG_SIZE;

/// Maximum size of one chunk on the wire
pub const ENCRYPTED_CHUNK_SIZE: usize = CHUNK_SIZE + CHUNK_OVERHEAD;
