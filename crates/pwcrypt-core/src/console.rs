//! Interactive terminal access
//!
//! [`Terminal`] talks to the controlling terminal; [`ScriptedConsole`] runs
//! the same prompts against any reader/writer pair.

use std::io::{self, BufRead, Write};

use secrecy::SecretString;
use zeroize::Zeroizing;

/// Prompt-and-answer surface used by the passphrase and overwrite prompts.
///
/// Every read returns `Ok(None)` at end of input.
pub trait Console {
    /// Read one line without echoing it.
    fn read_hidden(&mut self, prompt: &str) -> io::Result<Option<SecretString>>;

    /// Read one visible line, newline stripped.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    /// Show an informational line to the user.
    fn notice(&mut self, message: &str) -> io::Result<()>;
}

/// The process's terminal: hidden input through `rpassword`, which turns
/// echo off for the read and restores the previous mode when it returns,
/// on error paths too.
///
/// Limits:
/// - Hidden reads come from the controlling terminal (`/dev/tty` on Unix)
///   while visible answers such as the overwrite prompt come from stdin.
///   Redirecting stdin therefore only scripts the visible answers; use
///   [`ScriptedConsole`] to drive both from one source.
/// - Passphrases must be valid UTF-8. Other bytes make the read fail with
///   [`io::ErrorKind::InvalidData`] rather than being passed through.
#[derive(Debug, Default)]
pub struct Terminal;

impl Terminal {
    pub fn new() -> Self {
        Self
    }
}

impl Console for Terminal {
    fn read_hidden(&mut self, prompt: &str) -> io::Result<Option<SecretString>> {
        match rpassword::prompt_password(prompt) {
            Ok(line) => Ok(Some(SecretString::from(line))),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(strip_newline(&line).to_owned()))
    }

    fn notice(&mut self, message: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{message}")?;
        stdout.flush()
    }
}

/// A console fed from a reader, with prompts and notices written to a writer.
///
/// Hidden reads behave exactly like visible ones apart from where the line
/// ends up: it goes straight into a [`SecretString`].
pub struct ScriptedConsole<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ScriptedConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn prompt(&mut self, prompt: &str) -> io::Result<()> {
        self.output.write_all(prompt.as_bytes())?;
        self.output.flush()
    }
}

impl<R: BufRead, W: Write> Console for ScriptedConsole<R, W> {
    fn read_hidden(&mut self, prompt: &str) -> io::Result<Option<SecretString>> {
        self.prompt(prompt)?;
        let mut line = Zeroizing::new(String::new());
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        // Hidden input leaves the cursor on the prompt line.
        self.output.write_all(b"\n")?;
        Ok(Some(SecretString::from(strip_newline(&line).to_owned())))
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.prompt(prompt)?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(strip_newline(&line).to_owned()))
    }

    fn notice(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{message}")?;
        self.output.flush()
    }
}

fn strip_newline(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
