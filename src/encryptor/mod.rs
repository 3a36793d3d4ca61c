// src/encryptor/mod.rs

//! Export side of the envelope.
//!
//! Core API: [`export_envelope`] writes `IV ‖ AES-256-CBC(pad(gzip(records))) ‖ HMAC`.
//! The stages are public for callers that assemble envelopes by hand.

pub(crate) mod export;
pub(crate) mod stream;
pub(crate) mod write;

#[cfg(test)]
pub(crate) use export::export_envelope_with_iv;
pub use export::{export_envelope, ExportSummary};
pub use stream::encrypt_stream;
pub use write::{write_iv, MacWriter};
