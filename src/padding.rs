//! # Size-Bucket Padding
//!
//! The compressed payload is padded with zero bytes up to the next member of a
//! fixed bucket set before encryption, so the ciphertext length only reveals
//! which bucket a backup falls into.
//!
//! Buckets start at [`PADDING_MIN_BUCKET`] and each one is 5% larger than the
//! previous (integer arithmetic, always at least one byte larger). Overhead is
//! therefore capped at roughly 5% and the number of distinguishable sizes grows
//! logarithmically with the backup size.
//!
//! The gzip member carries its own end marker, so padding never needs a length
//! field: on import the decoder stops at the member trailer and
//! [`strip_padding`] drains what is left, insisting it is all zeros.

use crate::consts::{PADDING_GROWTH_DIVISOR, PADDING_MIN_BUCKET};
use crate::error::{BackupError, Pass, Stage};
use std::io::{self, Read};

/// The bucket following `bucket`.
#[inline]
fn next_bucket(bucket: u64) -> u64 {
    bucket.saturating_add((bucket / PADDING_GROWTH_DIVISOR).max(1))
}

/// Smallest bucket that can hold `len` bytes.
pub fn padded_size(len: u64) -> u64 {
    let mut bucket = PADDING_MIN_BUCKET;
    while bucket < len {
        bucket = next_bucket(bucket);
    }
    bucket
}

/// `true` if `len` is exactly one of the bucket sizes.
pub fn is_bucket_size(len: u64) -> bool {
    padded_size(len) == len
}

/// Pull-based padding stage: passes `inner` through, then emits zero bytes
/// until the total reaches [`padded_size`] of what `inner` produced.
pub struct PaddingReader<R> {
    inner: R,
    consumed: u64,
    target: Option<u64>,
    emitted: u64,
}

impl<R: Read> PaddingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            consumed: 0,
            target: None,
            emitted: 0,
        }
    }

    /// Bytes taken from the inner reader so far.
    pub fn content_len(&self) -> u64 {
        self.consumed
    }

    /// Final padded length, known once the inner reader hit EOF.
    pub fn padded_len(&self) -> Option<u64> {
        self.target
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }
}

impl<R: Read> Read for PaddingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let target = match self.target {
            Some(target) => target,
            None => {
                let n = self.inner.read(buf)?;
                if n > 0 {
                    self.consumed += n as u64;
                    return Ok(n);
                }
                let target = padded_size(self.consumed);
                self.target = Some(target);
                target
            }
        };

        let remaining = target - self.consumed - self.emitted;
        let n = remaining.min(buf.len() as u64) as usize;
        buf[..n].fill(0);
        self.emitted += n as u64;
        Ok(n)
    }
}

/// Drain the plaintext left after the gzip member and check it is padding.
///
/// Returns the number of padding bytes consumed.
pub fn strip_padding<R: Read + ?Sized>(reader: &mut R, pass: Pass) -> Result<u64, BackupError> {
    let mut scratch = [0u8; 4096];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut scratch) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(BackupError::from_io(e, pass, Stage::Padding)),
        };
        if scratch[..n].iter().any(|&b| b != 0) {
            return Err(BackupError::MalformedContainer {
                pass,
                stage: Stage::Padding,
                reason: "non-zero byte after the compressed stream".into(),
            });
        }
        total += n as u64;
    }
}
