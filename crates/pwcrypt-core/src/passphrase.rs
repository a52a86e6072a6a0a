//! Passphrase entry with optional confirmation

use std::io;

use secrecy::{ExposeSecret, SecretString};

use crate::console::Console;
use crate::error::{PwcryptError, PwcryptResult};

/// Longest accepted passphrase in bytes; longer entries are cut to fit.
pub const PASSPHRASE_MAX_BYTES: usize = 127;

const INVISIBLE_NOTICE: &str = "Do not panic if writing is invisible";
const ENCRYPT_PROMPT: &str = "Enter secret encryption password: ";
const DECRYPT_PROMPT: &str = "Enter secret decryption password: ";
const CONFIRM_PROMPT: &str = "Confirm encryption password: ";

/// Read a passphrase from `console` with echo disabled.
///
/// With `confirm` set the user must type it a second time; on a mismatch the
/// confirmation alone is asked for again until it matches. End of input at
/// any prompt is an I/O error.
pub fn prompt_passphrase(console: &mut dyn Console, confirm: bool) -> PwcryptResult<SecretString> {
    console
        .notice(INVISIBLE_NOTICE)
        .map_err(|e| PwcryptError::io("writing to terminal", e))?;

    let prompt = if confirm {
        ENCRYPT_PROMPT
    } else {
        DECRYPT_PROMPT
    };
    let passphrase = read_bounded(console, prompt)?;
    if !confirm {
        return Ok(passphrase);
    }

    loop {
        let again = read_bounded(console, CONFIRM_PROMPT)?;
        if again.expose_secret().as_bytes() == passphrase.expose_secret().as_bytes() {
            tracing::debug!("passphrase confirmed");
            return Ok(passphrase);
        }

        tracing::warn!("passphrase confirmation did not match");
        console
            .notice("Passwords do not match! Be more careful")
            .map_err(|e| PwcryptError::io("writing to terminal", e))?;
    }
}

fn read_bounded(console: &mut dyn Console, prompt: &str) -> PwcryptResult<SecretString> {
    let entry = console
        .read_hidden(prompt)
        .map_err(|e| PwcryptError::io("reading passphrase", e))?
        .ok_or_else(|| {
            PwcryptError::io(
                "reading passphrase",
                io::Error::new(io::ErrorKind::UnexpectedEof, "end of input"),
            )
        })?;

    let text = entry.expose_secret();
    if text.len() <= PASSPHRASE_MAX_BYTES {
        return Ok(entry);
    }

    let mut end = PASSPHRASE_MAX_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    tracing::warn!(
        max_bytes = PASSPHRASE_MAX_BYTES,
        "passphrase too long, truncated"
    );
    Ok(SecretString::from(text[..end].to_owned()))
}
