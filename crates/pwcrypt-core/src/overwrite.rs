use std::path::Path;

use crate::console::Console;
use crate::error::{PwcryptError, PwcryptResult};

/// Answer to "output exists, overwrite?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overwrite {
    Proceed,
    Abort,
}

/// Ask before clobbering `path`. Call only when it already exists.
///
/// The first non-blank character of the answer decides (`y` or `n`, either
/// case) and the rest of the line is ignored. An empty answer or end of input
/// means no; anything else asks again.
pub fn confirm_overwrite(console: &mut dyn Console, path: &Path) -> PwcryptResult<Overwrite> {
    let prompt = format!("File '{}' already exists. Overwrite? [y/n]: ", path.display());
    loop {
        let Some(answer) = console
            .read_line(&prompt)
            .map_err(|e| PwcryptError::io("reading overwrite confirmation", e))?
        else {
            tracing::debug!(path = %path.display(), "end of input at overwrite prompt");
            return Ok(Overwrite::Abort);
        };

        match answer.trim_start_matches([' ', '\t']).chars().next() {
            None => return Ok(Overwrite::Abort),
            Some('y' | 'Y') => return Ok(Overwrite::Proceed),
            Some('n' | 'N') => return Ok(Overwrite::Abort),
            Some(_) => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;

    fn answer(input: &str) -> (Overwrite, usize) {
        let mut console = ScriptedConsole::new(input.as_bytes(), Vec::new());
        let decision = confirm_overwrite(&mut console, Path::new("out.enc")).unwrap();
        let shown = String::from_utf8(console.into_output()).unwrap();
        (decision, shown.matches("Overwrite? [y/n]").count())
    }

    #[test]
    fn test_yes() {
        assert_eq!(answer("y\n"), (Overwrite::Proceed, 1));
        assert_eq!(answer("Y\n"), (Overwrite::Proceed, 1));
        assert_eq!(answer("yes please\n"), (Overwrite::Proceed, 1));
        assert_eq!(answer("  \tY\n"), (Overwrite::Proceed, 1));
    }

    #[test]
    fn test_no() {
        assert_eq!(answer("n\n"), (Overwrite::Abort, 1));
        assert_eq!(answer("No\n"), (Overwrite::Abort, 1));
        assert_eq!(answer(" nope\n"), (Overwrite::Abort, 1));
    }

    #[test]
    fn test_bare_newline_is_no() {
        assert_eq!(answer("\n"), (Overwrite::Abort, 1));
        assert_eq!(answer("\r\n"), (Overwrite::Abort, 1));
    }

    #[test]
    fn test_end_of_input_is_no() {
        assert_eq!(answer(""), (Overwrite::Abort, 1));
    }

    #[test]
    fn test_unrecognised_answer_asks_again() {
        assert_eq!(answer("maybe\nq\ny\n"), (Overwrite::Proceed, 3));
        assert_eq!(answer("x\n"), (Overwrite::Abort, 2));
    }

    #[test]
    fn test_prompt_names_the_file() {
        let mut console = ScriptedConsole::new(&b"n\n"[..], Vec::new());
        confirm_overwrite(&mut console, Path::new("/tmp/secret.enc")).unwrap();
        let shown = String::from_utf8(console.into_output()).unwrap();
        assert!(shown.contains("'/tmp/secret.enc'"));
    }
}
