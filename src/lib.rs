// src/lib.rs

//! Encrypted, authenticated, size-obfuscated backup envelopes.
//!
//! An envelope is `IV(16) ‖ AES-256-CBC(gzip(records) ‖ zero padding) ‖ HMAC-SHA256(32)`.
//! Export streams records through every stage without buffering the backup;
//! import authenticates the whole envelope before producing any plaintext and
//! re-checks the MAC while decrypting. See [`BackupService`].

pub mod aliases;
pub mod config;
pub mod consts;
pub mod crypto;
pub mod decryptor;
pub mod encryptor;
pub mod error;
pub mod keys;
pub mod padding;
pub mod records;
pub mod service;
pub mod utils;

// High-level API
pub use config::BackupConfig;
pub use error::{BackupError, Pass, Stage};
pub use keys::{KeyMaterial, KeyProvider, PassphraseKeys, StaticKeys};
pub use service::BackupService;

pub use decryptor::{reopen_file, ImportState, ImportSummary, ImportVerifier, SourceFactory};
pub use encryptor::{export_envelope, ExportSummary};
pub use records::{QuarantineSink, RecordSink, RecordSource};

pub use aliases::AccountSecret;
pub use padding::{is_bucket_size, padded_size};
