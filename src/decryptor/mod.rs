// src/decryptor/mod.rs

//! Import side of the envelope.
//!
//! Core API: [`ImportVerifier`] drives both passes over a [`SourceFactory`].
//! The stream stages ([`TrailerSplitter`], [`CbcDecryptReader`]) are public for
//! custom flows and tests.

pub(crate) mod import;
pub(crate) mod read;
pub(crate) mod stream;

pub use import::{ImportState, ImportSummary, ImportVerifier};
pub use read::{read_exact_span, read_iv, reopen_file, SourceFactory};
pub use stream::{CbcDecryptReader, MacOutcome, TrailerSplitter};
