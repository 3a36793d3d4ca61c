// src/decryptor/stream/mod.rs
pub(crate) mod context;
pub(crate) mod trailer;

pub use context::CbcDecryptReader;
pub use trailer::{MacOutcome, TrailerSplitter};
