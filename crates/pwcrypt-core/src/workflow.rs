//! End-to-end encrypt/decrypt runs
//!
//! ```text
//! encrypt: validate → overwrite guard → tar → temp archive → container → (remove input)
//! decrypt: validate → header + passphrase → temp archive → tar -x → (remove input)
//! ```
//!
//! Raw mode skips the archiver and works on a single file. Temporary
//! archives live next to their final destination and are deleted on every
//! exit path.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use pwcrypt_crypto::{KdfParams, StreamSummary};

use crate::archive::Archiver;
use crate::config::{NamingConfig, PwcryptConfig};
use crate::console::Console;
use crate::error::{PwcryptError, PwcryptResult};
use crate::naming::{append_suffix, decrypt_output, encrypt_output, sanitize_input};
use crate::ops::{decrypt_file, decrypt_into, encrypt_file, guard_output, write_container};

const TEMP_PREFIX: &str = ".pwcrypt-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Encrypt,
    Decrypt,
}

/// One invocation, as parsed from the command line.
#[derive(Debug, Clone)]
pub struct Request {
    pub mode: Mode,
    pub input: PathBuf,
    /// Container path when encrypting; extraction directory (archive mode)
    /// or plaintext path (raw mode) when decrypting.
    pub output: Option<PathBuf>,
    /// Skip the archiver and process the input as a single file.
    pub raw: bool,
    /// Delete the input after a successful run.
    pub remove_input: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub output: PathBuf,
    pub summary: StreamSummary,
    pub removed_input: bool,
}

pub struct Workflow {
    archiver: Option<Archiver>,
    archive_suffix: String,
    naming: NamingConfig,
    params: KdfParams,
}

impl Workflow {
    pub fn new(config: &PwcryptConfig, params: KdfParams) -> Self {
        Self {
            archiver: config
                .archive
                .enabled
                .then(|| Archiver::from_config(&config.archive)),
            archive_suffix: config.archive.suffix.clone(),
            naming: config.naming.clone(),
            params,
        }
    }

    pub fn run(&self, request: &Request, console: &mut dyn Console) -> PwcryptResult<Outcome> {
        let input = sanitize_input(&request.input);
        let is_dir = validate_input(&input)?;

        let archiver = if request.raw {
            None
        } else {
            self.archiver.as_ref()
        };

        let (output, summary) = match (request.mode, archiver) {
            (Mode::Encrypt, Some(archiver)) => {
                self.encrypt_archived(archiver, &input, request.output.as_deref(), console)?
            }
            (Mode::Encrypt, None) => {
                if is_dir {
                    return Err(PwcryptError::Directory(input));
                }
                let output = request
                    .output
                    .clone()
                    .unwrap_or_else(|| encrypt_output(&input, &self.naming));
                ensure_distinct(&input, &output)?;
                let report = encrypt_file(&input, &output, console, &self.params)?;
                (report.output, report.summary)
            }
            (Mode::Decrypt, archiver) => {
                if is_dir {
                    return Err(PwcryptError::Directory(input));
                }
                match archiver {
                    Some(archiver) => {
                        self.decrypt_archived(archiver, &input, request.output.as_deref(), console)?
                    }
                    None => {
                        let output = request
                            .output
                            .clone()
                            .unwrap_or_else(|| decrypt_output(&input, &self.naming));
                        ensure_distinct(&input, &output)?;
                        let report = decrypt_file(&input, &output, console, &self.params)?;
                        (report.output, report.summary)
                    }
                }
            }
        };

        let removed_input = request.remove_input && remove_input(&input, is_dir);
        Ok(Outcome {
            output,
            summary,
            removed_input,
        })
    }

    fn encrypt_archived(
        &self,
        archiver: &Archiver,
        input: &Path,
        output: Option<&Path>,
        console: &mut dyn Console,
    ) -> PwcryptResult<(PathBuf, StreamSummary)> {
        let output = match output {
            Some(path) => path.to_path_buf(),
            None => encrypt_output(&append_suffix(input, &self.archive_suffix), &self.naming),
        };
        ensure_distinct(input, &output)?;
        guard_output(console, &output)?;

        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(&self.archive_suffix)
            .tempfile_in(parent_dir(&output))
            .map_err(|e| PwcryptError::io("creating temporary archive", e))?
            .into_temp_path();

        tracing::info!(input = %input.display(), "archiving");
        archiver.create(input, &temp)?;

        let report = write_container(&temp, &output, console, &self.params)?;
        tracing::debug!(archive = %temp.display(), "removing temporary archive");
        temp.close()
            .map_err(|e| PwcryptError::io("removing temporary archive", e))?;

        Ok((report.output, report.summary))
    }

    fn decrypt_archived(
        &self,
        archiver: &Archiver,
        input: &Path,
        dest: Option<&Path>,
        console: &mut dyn Console,
    ) -> PwcryptResult<(PathBuf, StreamSummary)> {
        let dest = dest.map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        if dest.exists() && !dest.is_dir() {
            return Err(PwcryptError::Archive(format!(
                "extraction target {} is not a directory",
                dest.display()
            )));
        }
        let created = first_missing_ancestor(&dest);
        fs::create_dir_all(&dest)
            .map_err(|e| PwcryptError::io(format!("creating {}", dest.display()), e))?;

        let result = self.extract_container(archiver, input, &dest, console);
        if let (Err(_), Some(root)) = (&result, &created) {
            tracing::debug!(dir = %root.display(), "removing extraction directory");
            if let Err(e) = fs::remove_dir_all(root) {
                tracing::warn!(dir = %root.display(), "could not remove extraction directory: {e}");
            }
        }
        Ok((dest, result?))
    }

    fn extract_container(
        &self,
        archiver: &Archiver,
        input: &Path,
        dest: &Path,
        console: &mut dyn Console,
    ) -> PwcryptResult<StreamSummary> {
        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(&self.archive_suffix)
            .tempfile_in(dest)
            .map_err(|e| PwcryptError::io("creating temporary archive", e))?;

        let summary = {
            let mut writer = BufWriter::new(temp.as_file_mut());
            let summary = decrypt_into(input, &mut writer, console, &self.params)?;
            writer
                .flush()
                .map_err(|e| PwcryptError::io("writing temporary archive", e))?;
            summary
        };
        let temp = temp.into_temp_path();

        tracing::info!(dest = %dest.display(), "extracting");
        let extracted = archiver.extract(&temp, dest);
        tracing::debug!(archive = %temp.display(), "removing temporary archive");
        drop(temp);

        extracted.map_err(|e| match e {
            PwcryptError::Archive(msg) => PwcryptError::Archive(format!(
                "{msg}; extraction stopped, the archiver may have refused to overwrite existing files"
            )),
            other => other,
        })?;

        Ok(summary)
    }
}

/// Outermost directory that `create_dir_all(path)` would have to create.
fn first_missing_ancestor(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
        .last()
        .map(Path::to_path_buf)
}

/// Check the input exists and can be read. Returns whether it is a directory.
fn validate_input(input: &Path) -> PwcryptResult<bool> {
    let meta = fs::metadata(input).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PwcryptError::InputMissing(input.to_path_buf()),
        _ => PwcryptError::io(format!("inspecting {}", input.display()), e),
    })?;

    if meta.is_dir() {
        fs::read_dir(input)
            .map_err(|e| PwcryptError::io(format!("cannot read {}", input.display()), e))?;
    } else {
        fs::File::open(input)
            .map_err(|e| PwcryptError::io(format!("cannot read {}", input.display()), e))?;
    }
    Ok(meta.is_dir())
}

/// Reject an output that names the input itself.
fn ensure_distinct(input: &Path, output: &Path) -> PwcryptResult<()> {
    let same = match (fs::canonicalize(input), resolve(output)) {
        (Ok(a), Some(b)) => a == b,
        _ => input == output,
    };
    if same {
        Err(PwcryptError::SamePath(output.to_path_buf()))
    } else {
        Ok(())
    }
}

/// Canonical form of a path that may not exist yet.
fn resolve(path: &Path) -> Option<PathBuf> {
    if let Ok(p) = fs::canonicalize(path) {
        return Some(p);
    }
    let name = path.file_name()?;
    fs::canonicalize(parent_dir(path)).ok().map(|dir| dir.join(name))
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Best effort: a failure is logged and reported as `false`.
fn remove_input(input: &Path, is_dir: bool) -> bool {
    let result = if is_dir {
        fs::remove_dir_all(input)
    } else {
        fs::remove_file(input)
    };
    match result {
        Ok(()) => {
            tracing::info!(path = %input.display(), "removed original input");
            true
        }
        Err(e) => {
            tracing::warn!(path = %input.display(), error = %e, "could not remove original input");
            false
        }
    }
}
