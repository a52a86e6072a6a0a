//! Single-file encrypt and decrypt
//!
//! These assume the caller has already checked that input and output differ.
//! The output file is only created once the passphrase is known and, when
//! decrypting, once the container header has been validated against it, so
//! a wrong password never clobbers anything.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use pwcrypt_crypto::{
    decrypt_chunks, derive_key, encrypt_chunks, init_pull, init_push, read_header, write_header,
    KdfParams, PullStream, Salt, StreamSummary,
};

use crate::console::Console;
use crate::error::{PwcryptError, PwcryptResult};
use crate::overwrite::{confirm_overwrite, Overwrite};
use crate::passphrase::prompt_passphrase;

/// What one file operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub output: PathBuf,
    pub summary: StreamSummary,
}

/// Encrypt `input` into a new container at `output`.
pub fn encrypt_file(
    input: &Path,
    output: &Path,
    console: &mut dyn Console,
    params: &KdfParams,
) -> PwcryptResult<FileReport> {
    guard_output(console, output)?;
    write_container(input, output, console, params)
}

/// [`encrypt_file`] without the overwrite prompt, for callers that asked
/// before doing other work.
pub(crate) fn write_container(
    input: &Path,
    output: &Path,
    console: &mut dyn Console,
    params: &KdfParams,
) -> PwcryptResult<FileReport> {
    let mut reader = open_input(input)?;

    let passphrase = prompt_passphrase(console, true)?;
    let salt = Salt::generate();
    let key = derive_key(&passphrase, &salt, params)?;
    drop(passphrase);
    let (mut stream, header) = init_push(&key)?;
    drop(key);

    let mut writer = create_output(output)?;
    write_header(&mut writer, &salt, &header)?;
    let summary = encrypt_chunks(&mut reader, &mut writer, &mut stream)?;
    finish_output(writer, output)?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        chunks = summary.chunks,
        bytes = summary.plaintext_bytes,
        "encrypted"
    );
    Ok(FileReport {
        output: output.to_path_buf(),
        summary,
    })
}

/// Decrypt the container at `input` into a new file at `output`.
pub fn decrypt_file(
    input: &Path,
    output: &Path,
    console: &mut dyn Console,
    params: &KdfParams,
) -> PwcryptResult<FileReport> {
    guard_output(console, output)?;
    let (mut reader, mut stream) = open_container(input, console, params)?;

    let mut writer = create_output(output)?;
    let summary = decrypt_chunks(&mut reader, &mut writer, &mut stream)?;
    finish_output(writer, output)?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        chunks = summary.chunks,
        bytes = summary.plaintext_bytes,
        "decrypted"
    );
    Ok(FileReport {
        output: output.to_path_buf(),
        summary,
    })
}

/// Decrypt the container at `input` into an already-open sink.
///
/// No overwrite check is made: the caller owns `writer`.
pub fn decrypt_into<W: Write>(
    input: &Path,
    writer: &mut W,
    console: &mut dyn Console,
    params: &KdfParams,
) -> PwcryptResult<StreamSummary> {
    let (mut reader, mut stream) = open_container(input, console, params)?;
    let summary = decrypt_chunks(&mut reader, writer, &mut stream)?;
    tracing::debug!(
        input = %input.display(),
        chunks = summary.chunks,
        "decrypted into stream"
    );
    Ok(summary)
}

/// Read the framing, ask for the passphrase, and validate the header.
///
/// Framing comes first so a file that is not a container is rejected
/// without a pointless password prompt.
fn open_container(
    input: &Path,
    console: &mut dyn Console,
    params: &KdfParams,
) -> PwcryptResult<(BufReader<File>, PullStream)> {
    let mut reader = open_input(input)?;
    let (salt, header) = read_header(&mut reader)?;

    let passphrase = prompt_passphrase(console, false)?;
    let key = derive_key(&passphrase, &salt, params)?;
    drop(passphrase);
    let stream = init_pull(&key, &header)?;

    Ok((reader, stream))
}

pub(crate) fn guard_output(console: &mut dyn Console, output: &Path) -> PwcryptResult<()> {
    if !output.exists() {
        return Ok(());
    }
    match confirm_overwrite(console, output)? {
        Overwrite::Proceed => Ok(()),
        Overwrite::Abort => {
            tracing::info!(output = %output.display(), "overwrite declined");
            Err(PwcryptError::Declined)
        }
    }
}

fn open_input(path: &Path) -> PwcryptResult<BufReader<File>> {
    match File::open(path) {
        Ok(file) => Ok(BufReader::new(file)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PwcryptError::InputMissing(path.to_path_buf()))
        }
        Err(e) => Err(PwcryptError::io(format!("opening {}", path.display()), e)),
    }
}

fn create_output(path: &Path) -> PwcryptResult<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| PwcryptError::io(format!("creating {}", path.display()), e))
}

fn finish_output(writer: BufWriter<File>, path: &Path) -> PwcryptResult<()> {
    let file = writer
        .into_inner()
        .map_err(|e| PwcryptError::io(format!("writing {}", path.display()), e.into_error()))?;
    file.sync_all()
        .map_err(|e| PwcryptError::io(format!("syncing {}", path.display()), e))
}
