//! pwcrypt: passphrase file encryption
//!
//! Usage:
//!   pwcrypt -e -i <path> [-o <container>] [--raw] [-r]
//!   pwcrypt -d -i <container> [-o <dir|file>] [--raw] [-r]
//!
//! Exit status: 0 on success, 1 on error, 2 when the user declines to
//! overwrite an existing file.

use anyhow::Result;
use clap::{ArgGroup, Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pwcrypt_core::{Mode, PwcryptConfig, PwcryptError, Request, Terminal, Workflow};
use pwcrypt_crypto::{AuthFailure, CryptoError, KdfParams};

#[derive(Parser, Debug)]
#[command(
    name = "pwcrypt",
    version,
    about = "Encrypt files and directories with a passphrase",
    long_about = "pwcrypt: passphrase-based file encryption (Argon2id + chunked XChaCha20-Poly1305).\n\
                  Inputs are archived with tar before encryption unless --raw is given."
)]
#[command(group(
    ArgGroup::new("mode").required(true).args(["encrypt", "decrypt"])
))]
struct Cli {
    /// Encrypt the input
    #[arg(long, short = 'e')]
    encrypt: bool,

    /// Decrypt the input
    #[arg(long, short = 'd')]
    decrypt: bool,

    /// File or directory to process
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Output container (encrypt), extraction directory (decrypt), or
    /// plaintext file (decrypt with --raw)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Delete the input after a successful run
    #[arg(long, short = 'r')]
    remove_input: bool,

    /// Process a single file without the archiver
    #[arg(long)]
    raw: bool,

    /// Path to pwcrypt.toml configuration file
    #[arg(long, short = 'c', env = "PWCRYPT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "PWCRYPT_LOG")]
    log: Option<String>,

    /// Log format (json, text); overrides the config file
    #[arg(long, env = "PWCRYPT_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let level = cli.log.clone().unwrap_or_else(|| config.logging.level.clone());
    let format = cli.log_format.clone().unwrap_or(match config.logging.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format);

    if let Some(path) = cli.config.as_deref().filter(|p| !p.exists()) {
        tracing::warn!(
            "config file not found: {}  (using defaults)",
            path.display()
        );
    }

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&cli, &e),
    }
}

fn run(cli: &Cli, config: &PwcryptConfig) -> Result<()> {
    let mode = if cli.encrypt {
        Mode::Encrypt
    } else {
        Mode::Decrypt
    };
    let request = Request {
        mode,
        input: cli.input.clone(),
        output: cli.output.clone(),
        raw: cli.raw,
        remove_input: cli.remove_input,
    };

    tracing::debug!(?mode, input = %cli.input.display(), raw = cli.raw, "starting");

    let workflow = Workflow::new(config, KdfParams::interactive());
    let outcome = workflow.run(&request, &mut Terminal::new())?;

    let verb = match mode {
        Mode::Encrypt => "encrypted",
        Mode::Decrypt if cli.raw || !config.archive.enabled => "decrypted",
        Mode::Decrypt => "decrypted and extracted",
    };
    println!(
        "Input '{}' {verb} to '{}'",
        cli.input.display(),
        outcome.output.display()
    );

    if cli.remove_input {
        if outcome.removed_input {
            println!("Removed original input: '{}'", cli.input.display());
        } else {
            eprintln!(
                "Warning: could not remove original input '{}'",
                cli.input.display()
            );
        }
    }
    Ok(())
}

/// Print a failure the way the user needs to read it and pick the exit code.
fn report(cli: &Cli, err: &anyhow::Error) -> ExitCode {
    let (lines, code) = explain(err, cli.decrypt, cli.raw);
    for line in lines {
        eprintln!("{line}");
    }
    ExitCode::from(code)
}

/// Messages for `err` and the exit status that goes with them.
fn explain(err: &anyhow::Error, decrypt: bool, raw: bool) -> (Vec<String>, u8) {
    let Some(err) = err.downcast_ref::<PwcryptError>() else {
        return (vec![format!("Error: {err:#}")], 1);
    };

    let lines = match err {
        PwcryptError::Declined => return (vec!["Program terminated by user".into()], 2),
        PwcryptError::Crypto(CryptoError::Auth(AuthFailure::Header)) => {
            vec!["Error: invalid header. Wrong password or corrupted file.".into()]
        }
        PwcryptError::Crypto(CryptoError::Auth(AuthFailure::Chunk)) => {
            vec!["Error: decryption failed (corrupted chunk or wrong key)".into()]
        }
        PwcryptError::Crypto(CryptoError::Format(msg)) => {
            let mut lines = vec![format!("Error: {msg}")];
            if decrypt {
                lines.push("The input is truncated or is not a pwcrypt container.".into());
                lines.push(
                    "Directories must be archived before encryption; drop --raw when encrypting one."
                        .into(),
                );
            }
            lines
        }
        PwcryptError::Crypto(CryptoError::Resource(msg)) => {
            vec![format!("Error: not enough memory for key derivation: {msg}")]
        }
        PwcryptError::Crypto(CryptoError::Cipher(msg)) => {
            vec![format!("Error: internal cipher failure: {msg}")]
        }
        PwcryptError::Directory(_) => {
            let mut lines = vec![format!("Error: {err}")];
            if raw {
                lines.push("Drop --raw to encrypt a directory through the archiver.".into());
            }
            lines
        }
        PwcryptError::Archive(_) => {
            let mut lines = vec![format!("Error: {err}")];
            if decrypt {
                lines.push("Extraction stopped to prevent data loss.".into());
            }
            lines
        }
        other => vec![format!("Error: {other}")],
    };
    (lines, 1)
}

fn load_config(path: Option<&Path>) -> Result<PwcryptConfig> {
    match path {
        Some(path) => Ok(PwcryptConfig::load(path)?),
        None => Ok(PwcryptConfig::default()),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
