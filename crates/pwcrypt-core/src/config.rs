use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PwcryptError, PwcryptResult};

/// Top-level configuration (loaded from pwcrypt.toml)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PwcryptConfig {
    pub logging: LoggingConfig,
    pub archive: ArchiveConfig,
    pub naming: NamingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

/// External archiver settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Wrap inputs in an archive before encrypting (default: true)
    pub enabled: bool,
    /// Archiver executable, invoked with tar-compatible flags
    pub program: String,
    /// gzip the archive (`z` flag)
    pub compress: bool,
    /// Refuse to overwrite existing files on extraction (`k` flag)
    pub keep_existing: bool,
    /// Appended to the input name to form the archive name
    pub suffix: String,
}

/// Default output naming when no output path is given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub encrypt_suffix: String,
    pub decrypt_suffix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "tar".into(),
            compress: true,
            keep_existing: true,
            suffix: ".tar.gz".into(),
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            encrypt_suffix: ".enc".into(),
            decrypt_suffix: ".decn".into(),
        }
    }
}

impl PwcryptConfig {
    /// Load and validate a config file. A missing file yields the defaults;
    /// callers decide whether that deserves a warning.
    pub fn load(path: &Path) -> PwcryptResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| PwcryptError::io(format!("reading config: {}", path.display()), e))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| PwcryptError::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> PwcryptResult<()> {
        match self.logging.format.as_str() {
            "json" | "text" => {}
            other => {
                return Err(PwcryptError::Config(format!(
                    "logging.format must be \"json\" or \"text\", got {other:?}"
                )))
            }
        }
        if self.archive.program.trim().is_empty() {
            return Err(PwcryptError::Config("archive.program is empty".into()));
        }
        for (key, value) in [
            ("archive.suffix", &self.archive.suffix),
            ("naming.encrypt_suffix", &self.naming.encrypt_suffix),
            ("naming.decrypt_suffix", &self.naming.decrypt_suffix),
        ] {
            if value.is_empty() {
                return Err(PwcryptError::Config(format!("{key} is empty")));
            }
            if value.contains(std::path::is_separator) {
                return Err(PwcryptError::Config(format!(
                    "{key} must not contain a path separator"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[logging]
level = "debug"
format = "json"

[archive]
enabled = false
program = "bsdtar"
compress = false
keep_existing = false
suffix = ".tar"

[naming]
encrypt_suffix = ".pwc"
decrypt_suffix = ".plain"
"#;
        let config: PwcryptConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert!(!config.archive.enabled);
        assert_eq!(config.archive.program, "bsdtar");
        assert!(!config.archive.compress);
        assert!(!config.archive.keep_existing);
        assert_eq!(config.archive.suffix, ".tar");
        assert_eq!(config.naming.encrypt_suffix, ".pwc");
        assert_eq!(config.naming.decrypt_suffix, ".plain");
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_defaults() {
        let config: PwcryptConfig = toml::from_str("").unwrap();

        assert_eq!(config, PwcryptConfig::default());
        assert_eq!(config.logging.level, "warn");
        assert!(config.archive.enabled);
        assert_eq!(config.archive.program, "tar");
        assert_eq!(config.archive.suffix, ".tar.gz");
        assert_eq!(config.naming.encrypt_suffix, ".enc");
        assert_eq!(config.naming.decrypt_suffix, ".decn");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[archive]
keep_existing = false
"#;
        let config: PwcryptConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert!(!config.archive.keep_existing);
        // Defaults
        assert!(config.archive.compress);
        assert_eq!(config.archive.program, "tar");
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = PwcryptConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: PwcryptConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PwcryptConfig::default();
        config.logging.format = "yaml".into();
        assert!(matches!(config.validate(), Err(PwcryptError::Config(_))));

        let mut config = PwcryptConfig::default();
        config.naming.encrypt_suffix = String::new();
        assert!(matches!(config.validate(), Err(PwcryptError::Config(_))));

        let mut config = PwcryptConfig::default();
        config.archive.suffix = "/x.tar".into();
        assert!(matches!(config.validate(), Err(PwcryptError::Config(_))));

        let mut config = PwcryptConfig::default();
        config.archive.program = "  ".into();
        assert!(matches!(config.validate(), Err(PwcryptError::Config(_))));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = PwcryptConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, PwcryptConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pwcrypt.toml");
        std::fs::write(&path, "[naming]\nencrypt_suffix = \".sealed\"\n").unwrap();

        let config = PwcryptConfig::load(&path).unwrap();
        assert_eq!(config.naming.encrypt_suffix, ".sealed");
        assert_eq!(config.naming.decrypt_suffix, ".decn");
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[archive\nenabled = ").unwrap();

        assert!(matches!(
            PwcryptConfig::load(&path),
            Err(PwcryptError::Config(_))
        ));
    }
}
