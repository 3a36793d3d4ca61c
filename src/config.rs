// src/config.rs
//! Pipeline configuration.
//!
//! Defaults are safe for production; a TOML file can override any subset:
//!
//! ```toml
//! chunk_size = 65536
//! compression_level = 6
//! max_record_len = 67108864
//! ```
//!
//! Nothing here changes the wire format. Padding buckets are fixed constants
//! because configurable buckets would make exports distinguishable by size.

use crate::consts::{
    BLOCK_LEN, DEFAULT_CHUNK_SIZE, DEFAULT_COMPRESSION_LEVEL, DEFAULT_MAX_RECORD_LEN,
    MAX_CHUNK_SIZE, MAX_COMPRESSION_LEVEL, MIN_CHUNK_SIZE,
};
use crate::error::BackupError;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackupConfig {
    /// Bytes each streaming stage reads or writes at a time.
    pub chunk_size: usize,
    /// gzip level, 0 (store) to 9 (best).
    pub compression_level: u32,
    /// Largest single record accepted on export or import.
    pub max_record_len: u32,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            max_record_len: DEFAULT_MAX_RECORD_LEN,
        }
    }
}

impl BackupConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level;
        self
    }

    #[must_use]
    pub fn with_max_record_len(mut self, max_record_len: u32) -> Self {
        self.max_record_len = max_record_len;
        self
    }

    pub fn validate(&self) -> Result<(), BackupError> {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(BackupError::Config(format!(
                "chunk_size must be in {MIN_CHUNK_SIZE}..={MAX_CHUNK_SIZE}, got {}",
                self.chunk_size
            )));
        }
        if self.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(BackupError::Config(format!(
                "compression_level must be at most {MAX_COMPRESSION_LEVEL}, got {}",
                self.compression_level
            )));
        }
        if self.max_record_len == 0 {
            return Err(BackupError::Config("max_record_len must be positive".into()));
        }
        Ok(())
    }

    /// Parse and validate a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, BackupError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| BackupError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BackupError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BackupError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Chunk size rounded down to whole AES blocks.
    #[inline]
    pub(crate) fn block_chunk(&self) -> usize {
        (self.chunk_size / BLOCK_LEN).max(1) * BLOCK_LEN
    }
}
