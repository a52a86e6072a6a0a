//! Container framing and the chunk processing loops
//!
//! ```text
//! [16 bytes: Argon2id salt][40 bytes: stream header][chunk]...[final chunk]
//! ```
//!
//! No sizes, names, or counts are stored. Chunk boundaries on the read side
//! come purely from fixed-size reads, and the final marker is the only proof
//! that the stream ended where the writer meant it to.

use std::io::{self, Read, Write};

use secrecy::SecretString;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{derive_key, KdfParams, Salt};
use crate::stream::{init_pull, init_push, PullStream, PushStream, StreamHeader};
use crate::{CHUNK_SIZE, ENCRYPTED_CHUNK_SIZE, HEADER_SIZE, SALT_SIZE};

/// Counters for one pass over a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Chunks written or read, including the final one
    pub chunks: u64,
    /// Plaintext bytes consumed or produced
    pub plaintext_bytes: u64,
    /// Chunk bytes on the wire (excludes salt and header)
    pub ciphertext_bytes: u64,
}

/// Write the salt and stream header at the start of a container.
pub fn write_header<W: Write>(
    writer: &mut W,
    salt: &Salt,
    header: &StreamHeader,
) -> CryptoResult<()> {
    writer.write_all(salt.as_bytes())?;
    writer.write_all(header.as_bytes())?;
    Ok(())
}

/// Read the salt and stream header from the start of a container.
///
/// Anything shorter than `SALT_SIZE + HEADER_SIZE` bytes is rejected with
/// [`CryptoError::Format`].
pub fn read_header<R: Read>(reader: &mut R) -> CryptoResult<(Salt, StreamHeader)> {
    let mut salt = [0u8; SALT_SIZE];
    let n = read_full(reader, &mut salt)?;
    if n != SALT_SIZE {
        return Err(CryptoError::format(format!(
            "truncated or not a valid container: salt needs {SALT_SIZE} bytes, found {n}"
        )));
    }

    let mut header = [0u8; HEADER_SIZE];
    let n = read_full(reader, &mut header)?;
    if n != HEADER_SIZE {
        return Err(CryptoError::format(format!(
            "truncated or not a valid container: stream header needs {HEADER_SIZE} bytes, found {n}"
        )));
    }

    Ok((Salt::from_bytes(salt), StreamHeader::from_bytes(header)))
}

/// Encrypt `reader` chunk by chunk until it is exhausted.
///
/// A read shorter than [`CHUNK_SIZE`] means end of input and produces the
/// final chunk. A source whose length is a multiple of the chunk size ends
/// with an empty final chunk, so the final marker is always written.
pub fn encrypt_chunks<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    stream: &mut PushStream,
) -> CryptoResult<StreamSummary> {
    let mut summary = StreamSummary::default();
    let mut buf = Zeroizing::new(vec![0u8; CHUNK_SIZE]);

    loop {
        let n = read_full(reader, &mut buf)?;
        let is_last = n < CHUNK_SIZE;

        let encrypted = stream.push(&buf[..n], is_last)?;
        writer.write_all(&encrypted)?;

        summary.chunks += 1;
        summary.plaintext_bytes += n as u64;
        summary.ciphertext_bytes += encrypted.len() as u64;

        if is_last {
            break;
        }
    }

    writer.flush()?;
    Ok(summary)
}

/// Decrypt chunks from `reader` until the final-tagged chunk.
///
/// Reaching end of input before the final chunk is a [`CryptoError::Format`]
/// error. The writer never emits a full-size final chunk, so bytes appended
/// after it land in the same read and fail authentication as
/// [`AuthFailure::Chunk`](crate::AuthFailure::Chunk). An authentication
/// failure stops the loop immediately; plaintext already written for earlier
/// chunks stays written.
pub fn decrypt_chunks<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    stream: &mut PullStream,
) -> CryptoResult<StreamSummary> {
    let mut summary = StreamSummary::default();
    let mut buf = vec![0u8; ENCRYPTED_CHUNK_SIZE];

    loop {
        let n = read_full(reader, &mut buf)?;
        if n == 0 {
            return Err(CryptoError::format(format!(
                "premature end of file: no final chunk after {} chunks (file is truncated)",
                summary.chunks
            )));
        }

        let (plaintext, tag) = stream.pull(&buf[..n])?;
        writer.write_all(&plaintext)?;

        summary.chunks += 1;
        summary.plaintext_bytes += plaintext.len() as u64;
        summary.ciphertext_bytes += n as u64;

        if tag.is_final() {
            break;
        }
    }

    writer.flush()?;
    Ok(summary)
}

/// Encrypt a whole stream under a passphrase: fresh salt, key derivation,
/// header, then chunks.
pub fn encrypt<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    passphrase: &SecretString,
    params: &KdfParams,
) -> CryptoResult<StreamSummary> {
    let salt = Salt::generate();
    let key = derive_key(passphrase, &salt, params)?;
    let (mut stream, header) = init_push(&key)?;

    write_header(writer, &salt, &header)?;
    let summary = encrypt_chunks(reader, writer, &mut stream)?;

    tracing::debug!(
        chunks = summary.chunks,
        bytes = summary.plaintext_bytes,
        "stream encrypted"
    );
    Ok(summary)
}

/// Decrypt a whole container produced by [`encrypt`].
pub fn decrypt<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    passphrase: &SecretString,
    params: &KdfParams,
) -> CryptoResult<StreamSummary> {
    let (salt, header) = read_header(reader)?;
    let key = derive_key(passphrase, &salt, params)?;
    let mut stream = init_pull(&key, &header)?;

    let summary = decrypt_chunks(reader, writer, &mut stream)?;

    tracing::debug!(
        chunks = summary.chunks,
        bytes = summary.plaintext_bytes,
        "stream decrypted"
    );
    Ok(summary)
}

/// Fill `buf` from `reader`, stopping early only at end of input.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuthFailure, CHUNK_OVERHEAD};
    use std::io::Cursor;

    fn fast_params() -> KdfParams {
        KdfParams {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    /// Reader that hands out at most three bytes per call.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(3).min(self.0.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_header_roundtrip() {
        let salt = Salt::from_bytes([9u8; SALT_SIZE]);
        let header = StreamHeader::from_bytes([7u8; HEADER_SIZE]);

        let mut out = Vec::new();
        write_header(&mut out, &salt, &header).unwrap();
        assert_eq!(out.len(), SALT_SIZE + HEADER_SIZE);

        let (salt2, header2) = read_header(&mut Cursor::new(out)).unwrap();
        assert_eq!(salt, salt2);
        assert_eq!(header, header2);
    }

    #[test]
    fn test_read_header_empty_input() {
        let result = read_header(&mut Cursor::new(Vec::<u8>::new()));
        assert!(matches!(result, Err(CryptoError::Format(_))));
    }

    #[test]
    fn test_read_header_salt_only() {
        let result = read_header(&mut Cursor::new(vec![0u8; SALT_SIZE + 5]));
        assert!(matches!(result, Err(CryptoError::Format(_))));
    }

    #[test]
    fn test_read_full_handles_short_reads() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut buf = [0u8; 64];
        let n = read_full(&mut Trickle(&data), &mut buf).unwrap();
        assert_eq!(n, 64);
        assert_eq!(&buf[..], &data[..64]);
    }

    #[test]
    fn test_roundtrip_with_short_reads() {
        let pw = SecretString::from("trickle");
        let data: Vec<u8> = (0..CHUNK_SIZE * 2 + 10).map(|i| (i % 251) as u8).collect();

        let mut container = Vec::new();
        encrypt(&mut Trickle(&data), &mut container, &pw, &fast_params()).unwrap();

        let mut out = Vec::new();
        decrypt(&mut Trickle(&container), &mut out, &pw, &fast_params()).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_summary_counts() {
        let pw = SecretString::from("counts");
        let data = vec![0xAAu8; CHUNK_SIZE + 1];

        let mut container = Vec::new();
        let summary = encrypt(&mut Cursor::new(&data), &mut container, &pw, &fast_params()).unwrap();

        assert_eq!(summary.chunks, 2);
        assert_eq!(summary.plaintext_bytes, data.len() as u64);
        assert_eq!(
            summary.ciphertext_bytes,
            (data.len() + 2 * CHUNK_OVERHEAD) as u64
        );
        assert_eq!(
            container.len() as u64,
            (SALT_SIZE + HEADER_SIZE) as u64 + summary.ciphertext_bytes
        );
    }

    #[test]
    fn test_trailing_data_rejected() {
        let pw = SecretString::from("trailing");

        for len in [0, 7, CHUNK_SIZE - 1, CHUNK_SIZE, CHUNK_SIZE * 2] {
            let data = vec![0x5Au8; len];
            let mut container = Vec::new();
            encrypt(&mut Cursor::new(&data), &mut container, &pw, &fast_params()).unwrap();
            container.push(0);

            let result =
                decrypt(&mut Cursor::new(container), &mut Vec::new(), &pw, &fast_params());
            assert!(
                matches!(result, Err(CryptoError::Auth(AuthFailure::Chunk))),
                "len {len}: got {result:?}"
            );
        }
    }
}
