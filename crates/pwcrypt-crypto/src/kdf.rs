//! Key derivation: Argon2id passphrase + salt → symmetric key

use argon2::{Algorithm, Argon2, Block, Params, Version};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::{KEY_SIZE, SALT_SIZE};

/// A 256-bit key derived from a passphrase via Argon2id.
///
/// Zeroized on drop to prevent secrets lingering in memory.
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Random per-container salt, stored verbatim at the start of the container.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Fresh salt from the thread RNG. Never reuse one across containers.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Salt").field(&"[16 bytes]").finish()
    }
}

/// Argon2id parameters for KDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub mem_cost_kib: u32,
    /// Time cost / passes
    pub time_cost: u32,
    /// Parallelism (lanes)
    pub parallelism: u32,
}

impl KdfParams {
    /// Interactive cost: 64 MiB, 2 passes, 1 lane.
    ///
    /// The container does not record these values, so every file ever written
    /// must be read back with exactly the same parameters.
    pub const fn interactive() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::interactive()
    }
}

/// Derive a 256-bit key from a passphrase and salt using Argon2id.
///
/// Working memory is reserved up front; if the host cannot provide it the
/// call fails with [`CryptoError::Resource`] instead of falling back to
/// cheaper parameters.
pub fn derive_key(
    passphrase: &SecretString,
    salt: &Salt,
    params: &KdfParams,
) -> CryptoResult<SymmetricKey> {
    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| CryptoError::Resource(format!("invalid Argon2id params: {e}")))?;

    let block_count = argon2_params.block_count();
    let mut memory: Vec<Block> = Vec::new();
    memory.try_reserve_exact(block_count).map_err(|_| {
        CryptoError::Resource(format!(
            "cannot allocate {block_count} KiB of Argon2id working memory"
        ))
    })?;
    memory.extend(std::iter::repeat_with(Block::default).take(block_count));

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = SymmetricKey::from_bytes([0u8; KEY_SIZE]);
    argon2
        .hash_password_into_with_memory(
            passphrase.expose_secret().as_bytes(),
            salt.as_bytes(),
            &mut key.bytes,
            &mut memory[..],
        )
        .map_err(|e| CryptoError::Resource(format!("Argon2id KDF failed: {e}")))?;

    tracing::debug!(
        mem_cost_kib = params.mem_cost_kib,
        time_cost = params.time_cost,
        "derived stream key"
    );
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> KdfParams {
        KdfParams {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_kdf_deterministic() {
        let passphrase = SecretString::from("test-passphrase-123");
        let salt = Salt::from_bytes([1u8; SALT_SIZE]);

        let key1 = derive_key(&passphrase, &salt, &fast_params()).unwrap();
        let key2 = derive_key(&passphrase, &salt, &fast_params()).unwrap();

        assert_eq!(
            key1.as_bytes(),
            key2.as_bytes(),
            "KDF must be deterministic"
        );
    }

    #[test]
    fn test_kdf_different_passphrases() {
        let salt = Salt::from_bytes([1u8; SALT_SIZE]);

        let key1 = derive_key(&SecretString::from("passphrase-a"), &salt, &fast_params()).unwrap();
        let key2 = derive_key(&SecretString::from("passphrase-b"), &salt, &fast_params()).unwrap();

        assert_ne!(
            key1.as_bytes(),
            key2.as_bytes(),
            "different passphrases must produce different keys"
        );
    }

    #[test]
    fn test_kdf_different_salts() {
        let passphrase = SecretString::from("same-passphrase");

        let key1 = derive_key(&passphrase, &Salt::from_bytes([1u8; SALT_SIZE]), &fast_params())
            .unwrap();
        let key2 = derive_key(&passphrase, &Salt::from_bytes([2u8; SALT_SIZE]), &fast_params())
            .unwrap();

        assert_ne!(
            key1.as_bytes(),
            key2.as_bytes(),
            "different salts must produce different keys"
        );
    }

    #[test]
    fn test_generated_salts_differ() {
        assert_ne!(Salt::generate(), Salt::generate());
    }

    #[test]
    fn test_invalid_params_are_resource_errors() {
        let params = KdfParams {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 0,
        };
        let err = derive_key(
            &SecretString::from("pw"),
            &Salt::from_bytes([0u8; SALT_SIZE]),
            &params,
        )
        .unwrap_err();

        assert!(matches!(err, CryptoError::Resource(_)), "got {err:?}");
    }

    #[test]
    fn test_unallocatable_memory_is_resource_error() {
        let params = KdfParams {
            mem_cost_kib: u32::MAX,
            time_cost: 1,
            parallelism: 1,
        };
        let err = derive_key(
            &SecretString::from("pw"),
            &Salt::from_bytes([0u8; SALT_SIZE]),
            &params,
        )
        .unwrap_err();

        match err {
            CryptoError::Resource(msg) => assert!(msg.contains("cannot allocate"), "{msg}"),
            other => panic!("expected Resource, got {other:?}"),
        }
    }

    #[test]
    fn test_interactive_is_default() {
        let params = KdfParams::default();
        assert_eq!(params, KdfParams::interactive());
        assert_eq!(params.mem_cost_kib, 64 * 1024);
        assert_eq!(params.time_cost, 2);
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = SymmetricKey::from_bytes([0x42u8; KEY_SIZE]);
        let rendered = format!("{key:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("66"));
    }
}
