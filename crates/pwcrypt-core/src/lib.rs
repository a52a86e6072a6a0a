//! pwcrypt-core: everything between the command line and the cipher
//!
//! Flow for one file:
//! ```text
//! overwrite guard → passphrase prompt → Argon2id → container header → chunk loop
//! ```
//!
//! The workflow layer wraps that flow with the external archiver (directories
//! and files are tarred before encryption and extracted after decryption),
//! temporary-file cleanup, and optional removal of the original input.

pub mod archive;
pub mod config;
pub mod console;
pub mod error;
pub mod naming;
pub mod ops;
pub mod overwrite;
pub mod passphrase;
pub mod workflow;

pub use archive::Archiver;
pub use config::PwcryptConfig;
pub use console::{Console, ScriptedConsole, Terminal};
pub use error::{PwcryptError, PwcryptResult};
pub use ops::{decrypt_file, decrypt_into, encrypt_file, FileReport};
pub use overwrite::{confirm_overwrite, Overwrite};
pub use passphrase::{prompt_passphrase, PASSPHRASE_MAX_BYTES};
pub use workflow::{Mode, Outcome, Request, Workflow};
