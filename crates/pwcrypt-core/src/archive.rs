//! External archiver invocation
//!
//! The archive's contents are opaque to pwcrypt: a tar-compatible program
//! packs the input into one file before encryption and unpacks the decrypted
//! stream afterwards.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::ArchiveConfig;
use crate::error::{PwcryptError, PwcryptResult};

#[derive(Debug, Clone)]
pub struct Archiver {
    program: String,
    compress: bool,
    keep_existing: bool,
}

impl Archiver {
    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self {
            program: config.program.clone(),
            compress: config.compress,
            keep_existing: config.keep_existing,
        }
    }

    /// `tar -czf <archive> -C <parent> <name>`: the archive stores `source`
    /// under its own name, without the leading directories.
    pub fn create_command(&self, source: &Path, archive: &Path) -> PwcryptResult<Command> {
        let name = source.file_name().ok_or_else(|| {
            PwcryptError::Archive(format!("cannot archive {}: no file name", source.display()))
        })?;
        let parent = match source.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut cmd = Command::new(&self.program);
        cmd.arg(self.flags('c', false))
            .arg(archive)
            .arg("-C")
            .arg(parent)
            .arg(name);
        Ok(cmd)
    }

    /// `tar -xzkf <archive> -C <dest>`
    pub fn extract_command(&self, archive: &Path, dest: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(self.flags('x', self.keep_existing))
            .arg(archive)
            .arg("-C")
            .arg(dest);
        cmd
    }

    pub fn create(&self, source: &Path, archive: &Path) -> PwcryptResult<()> {
        tracing::debug!(source = %source.display(), archive = %archive.display(), "creating archive");
        let cmd = self.create_command(source, archive)?;
        self.run(cmd, "archiving")
    }

    pub fn extract(&self, archive: &Path, dest: &Path) -> PwcryptResult<()> {
        tracing::debug!(archive = %archive.display(), dest = %dest.display(), "extracting archive");
        self.run(self.extract_command(archive, dest), "extraction")
    }

    fn flags(&self, mode: char, keep: bool) -> OsString {
        let mut flags = String::from("-");
        flags.push(mode);
        if self.compress {
            flags.push('z');
        }
        if keep {
            flags.push('k');
        }
        flags.push('f');
        flags.into()
    }

    fn run(&self, mut cmd: Command, what: &str) -> PwcryptResult<()> {
        let status = cmd.status().map_err(|e| {
            PwcryptError::Archive(format!("{what} failed: cannot run {}: {e}", self.program))
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(PwcryptError::Archive(format!(
                "{what} failed: {} exited {status}",
                self.program
            )))
        }
    }
}
