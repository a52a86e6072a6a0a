use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::NamingConfig;

/// Normalise a user-supplied input path: trailing separators are dropped
/// (`dir/` becomes `dir`) so derived names land next to the input, not in it.
pub fn sanitize_input(path: &Path) -> PathBuf {
    let cleaned: PathBuf = path.components().collect();
    if cleaned.as_os_str().is_empty() {
        path.to_path_buf()
    } else {
        cleaned
    }
}

/// `path` with `suffix` appended to its final component.
pub fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Default container name for `input`: `<input>.enc`.
pub fn encrypt_output(input: &Path, naming: &NamingConfig) -> PathBuf {
    append_suffix(input, &naming.encrypt_suffix)
}

/// Default plaintext name for a raw container `input`: `<input>.decn`.
pub fn decrypt_output(input: &Path, naming: &NamingConfig) -> PathBuf {
    append_suffix(input, &naming.decrypt_suffix)
}
