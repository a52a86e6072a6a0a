//! Chained XChaCha20-Poly1305 chunk stream
//!
//! Stream header (binary):
//! ```text
//! [24 bytes: random header nonce][16 bytes: key-check tag]
//! ```
//!
//! Encrypted chunk format (binary):
//! ```text
//! [1 byte: encrypted type marker][N bytes: ciphertext][16 bytes: Poly1305 tag]
//! nonce = 0^16 || chunk_index (8 bytes, big-endian)
//! AAD   = tag of the previous chunk (the header's key-check tag for chunk 0)
//! ```
//!
//! All AEAD operations use a per-stream subkey, HKDF-SHA256 of the derived key
//! salted with the header nonce. The header's key-check tag lets the reader
//! reject a wrong key before touching any chunk. Chaining each chunk's tag
//! into the next chunk's AAD means chunks cannot be reordered, dropped, or
//! spliced in from another stream without failing authentication.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{AuthFailure, CryptoError, CryptoResult};
use crate::kdf::SymmetricKey;
use crate::{CHUNK_OVERHEAD, CHUNK_SIZE, ENCRYPTED_CHUNK_SIZE, HEADER_SIZE, KEY_SIZE, NONCE_SIZE, TAG_SIZE};

const STREAM_INFO: &[u8] = b"pwcrypt-stream-v1";
const HEADER_AAD: &[u8] = b"pwcrypt-header-v1";

// Chunk nonces always start with 16 zero bytes, so this one is never reused.
const HEADER_CHECK_NONCE: [u8; NONCE_SIZE] = [0xFF; NONCE_SIZE];

/// Authenticated type marker carried inside every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChunkTag {
    /// More chunks follow.
    Message = 0x00,
    /// Last chunk of the stream.
    Final = 0x03,
}

impl ChunkTag {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Message),
            0x03 => Some(Self::Final),
            _ => None,
        }
    }

    pub fn is_final(self) -> bool {
        self == Self::Final
    }
}

/// Opaque stream initialisation data, bound to the key that produced it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader([u8; HEADER_SIZE]);

impl StreamHeader {
    pub fn from_bytes(bytes: [u8; HEADER_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HEADER_SIZE] {
        &self.0
    }

    fn nonce(&self) -> &[u8] {
        &self.0[..NONCE_SIZE]
    }

    fn check_tag(&self) -> &[u8] {
        &self.0[NONCE_SIZE..]
    }
}

impl std::fmt::Debug for StreamHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StreamHeader").field(&"[40 bytes]").finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Open,
    Finalized,
}

/// State shared by both directions: cipher, chunk counter, and chain value.
struct ChainState {
    cipher: XChaCha20Poly1305,
    counter: u64,
    chain: [u8; TAG_SIZE],
    phase: Phase,
}

impl ChainState {
    fn nonce(&self) -> [u8; NONCE_SIZE] {
        let mut nonce = [0u8; NONCE_SIZE];
        nonce[NONCE_SIZE - 8..].copy_from_slice(&self.counter.to_be_bytes());
        nonce
    }

    fn ensure_open(&self) -> CryptoResult<()> {
        match self.phase {
            Phase::Open => Ok(()),
            Phase::Finalized => Err(CryptoError::Finalized),
        }
    }

    fn advance(&mut self, tag: &[u8], chunk_tag: ChunkTag) -> CryptoResult<()> {
        self.chain.copy_from_slice(tag);
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or_else(|| CryptoError::format("chunk counter exhausted"))?;
        if chunk_tag.is_final() {
            self.phase = Phase::Finalized;
        }
        Ok(())
    }
}

/// Derive the per-stream cipher from the key and the header nonce.
fn stream_cipher(key: &SymmetricKey, header_nonce: &[u8]) -> CryptoResult<XChaCha20Poly1305> {
    let hkdf = Hkdf::<Sha256>::new(Some(header_nonce), key.as_bytes());
    let mut subkey = Zeroizing::new([0u8; KEY_SIZE]);
    hkdf.expand(STREAM_INFO, &mut subkey[..])
        .map_err(|e| CryptoError::Cipher(format!("HKDF expand failed: {e}")))?;
    Ok(XChaCha20Poly1305::new((&*subkey).into()))
}

fn header_check(cipher: &XChaCha20Poly1305) -> CryptoResult<Vec<u8>> {
    cipher
        .encrypt(
            XNonce::from_slice(&HEADER_CHECK_NONCE),
            Payload {
                msg: &[],
                aad: HEADER_AAD,
            },
        )
        .map_err(|e| CryptoError::Cipher(format!("header tag computation failed: {e}")))
}

/// Encrypting side of a stream.
pub struct PushStream {
    state: ChainState,
}

/// Decrypting side of a stream.
pub struct PullStream {
    state: ChainState,
}

/// Start an encrypting stream. Returns the state and the header that must be
/// stored ahead of the first chunk.
pub fn init_push(key: &SymmetricKey) -> CryptoResult<(PushStream, StreamHeader)> {
    let mut header = [0u8; HEADER_SIZE];
    rand::thread_rng().fill_bytes(&mut header[..NONCE_SIZE]);

    let cipher = stream_cipher(key, &header[..NONCE_SIZE])?;
    let check = header_check(&cipher)?;
    header[NONCE_SIZE..].copy_from_slice(&check);

    let mut chain = [0u8; TAG_SIZE];
    chain.copy_from_slice(&check);

    let stream = PushStream {
        state: ChainState {
            cipher,
            counter: 0,
            chain,
            phase: Phase::Open,
        },
    };
    Ok((stream, StreamHeader(header)))
}

/// Start a decrypting stream from a stored header.
///
/// Fails with [`CryptoError::Auth`] when the header was not produced under
/// `key`: this is where a wrong passphrase is detected.
pub fn init_pull(key: &SymmetricKey, header: &StreamHeader) -> CryptoResult<PullStream> {
    let cipher = stream_cipher(key, header.nonce())?;
    cipher
        .decrypt(
            XNonce::from_slice(&HEADER_CHECK_NONCE),
            Payload {
                msg: header.check_tag(),
                aad: HEADER_AAD,
            },
        )
        .map_err(|_| CryptoError::Auth(AuthFailure::Header))?;

    let mut chain = [0u8; TAG_SIZE];
    chain.copy_from_slice(header.check_tag());

    Ok(PullStream {
        state: ChainState {
            cipher,
            counter: 0,
            chain,
            phase: Phase::Open,
        },
    })
}

impl PushStream {
    /// Encrypt one chunk of at most [`CHUNK_SIZE`] bytes, tagging it final iff
    /// `is_last`.
    ///
    /// Returns `[encrypted marker][ciphertext][16-byte tag]`.
    pub fn push(&mut self, plaintext: &[u8], is_last: bool) -> CryptoResult<Vec<u8>> {
        self.state.ensure_open()?;
        if plaintext.len() > CHUNK_SIZE {
            return Err(CryptoError::format(format!(
                "chunk of {} bytes exceeds the {CHUNK_SIZE}-byte limit",
                plaintext.len()
            )));
        }

        let chunk_tag = if is_last {
            ChunkTag::Final
        } else {
            ChunkTag::Message
        };

        let mut msg = Zeroizing::new(Vec::with_capacity(1 + plaintext.len()));
        msg.push(chunk_tag as u8);
        msg.extend_from_slice(plaintext);

        let nonce = self.state.nonce();
        let encrypted = self
            .state
            .cipher
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: msg.as_slice(),
                    aad: &self.state.chain,
                },
            )
            .map_err(|e| CryptoError::Cipher(format!("chunk encryption failed: {e}")))?;

        self.state
            .advance(&encrypted[encrypted.len() - TAG_SIZE..], chunk_tag)?;
        Ok(encrypted)
    }

    pub fn is_finalized(&self) -> bool {
        self.state.phase == Phase::Finalized
    }

    /// Number of chunks pushed so far.
    pub fn chunks(&self) -> u64 {
        self.state.counter
    }
}

impl PullStream {
    /// Authenticate and decrypt one chunk, returning its plaintext and marker.
    ///
    /// Any authentication failure is fatal for the whole stream: the chain
    /// value is not advanced and the caller must stop.
    pub fn pull(&mut self, encrypted: &[u8]) -> CryptoResult<(Vec<u8>, ChunkTag)> {
        self.state.ensure_open()?;
        if encrypted.len() < CHUNK_OVERHEAD {
            return Err(CryptoError::format(format!(
                "truncated chunk: {} bytes (minimum {CHUNK_OVERHEAD})",
                encrypted.len()
            )));
        }
        if encrypted.len() > ENCRYPTED_CHUNK_SIZE {
            return Err(CryptoError::format(format!(
                "oversized chunk: {} bytes (maximum {ENCRYPTED_CHUNK_SIZE})",
                encrypted.len()
            )));
        }

        let nonce = self.state.nonce();
        let mut plaintext = self
            .state
            .cipher
            .decrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: encrypted,
                    aad: &self.state.chain,
                },
            )
            .map_err(|_| CryptoError::Auth(AuthFailure::Chunk))?;

        let marker = plaintext.remove(0);
        let chunk_tag = ChunkTag::from_byte(marker)
            .ok_or_else(|| CryptoError::format(format!("unknown chunk marker 0x{marker:02x}")))?;

        self.state
            .advance(&encrypted[encrypted.len() - TAG_SIZE..], chunk_tag)?;
        Ok((plaintext, chunk_tag))
    }

    pub fn is_finalized(&self) -> bool {
        self.state.phase == Phase::Finalized
    }

    /// Number of chunks pulled so far.
    pub fn chunks(&self) -> u64 {
        self.state.counter
    }
}
