//! # Constants
//!
//! Envelope geometry, streaming defaults, padding buckets and KDF limits.

/// Length of the cleartext CBC initialization vector that opens every envelope.
pub const IV_LEN: usize = 16;

/// Length of the trailing HMAC-SHA256 tag.
pub const MAC_LEN: usize = 32;

/// AES block size.
pub const BLOCK_LEN: usize = 16;

/// AES-256 key length.
pub const CIPHER_KEY_LEN: usize = 32;

/// Smallest envelope that can carry an IV and a MAC tag.
///
/// Anything shorter is rejected with
/// [`MissingAuthentication`](crate::BackupError::MissingAuthentication).
pub const ENVELOPE_MIN_LEN: usize = IV_LEN + MAC_LEN;

/// Length of the big-endian prefix in front of every framed record.
pub const RECORD_LEN_PREFIX: usize = 4;

/// Default streaming chunk (64 KiB). Bounds the memory held by each stage.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Smallest accepted chunk size: one AES block.
pub const MIN_CHUNK_SIZE: usize = BLOCK_LEN;

/// Largest accepted chunk size (16 MiB).
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Default gzip level, same as `gzip -6`.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Highest gzip level.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Default upper bound for a single record (64 MiB).
pub const DEFAULT_MAX_RECORD_LEN: u32 = 64 * 1024 * 1024;

/// First padding bucket. Every padded payload is at least this long.
pub const PADDING_MIN_BUCKET: u64 = 512;

/// Each bucket is `1 / PADDING_GROWTH_DIVISOR` larger than the previous one (5%).
pub const PADDING_GROWTH_DIVISOR: u64 = 20;

/// Minimum allowed PBKDF2 iteration count for [`PassphraseKeys`](crate::PassphraseKeys).
pub const PBKDF2_MIN_ITER: u32 = 1;

/// Maximum allowed PBKDF2 iteration count.
pub const PBKDF2_MAX_ITER: u32 = 5_000_000;

/// Default PBKDF2 iteration count.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 300_000;
