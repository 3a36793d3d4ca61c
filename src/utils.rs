// ============================================================================
// FILE: src/utils.rs
// ============================================================================

//! Utility functions shared by the cipher and framing stages.

use crate::consts::BLOCK_LEN;
use std::io::{self, Read};

/// XORs `other` into `block` (one AES block) in place.
///
/// # Panics (by contract)
///
/// Panics if either slice is shorter than 16 bytes. Callers always pass
/// `chunks_exact(16)` slices or 16-byte arrays.
#[inline(always)]
pub fn xor_in_place(block: &mut [u8], other: &[u8]) {
    for (b, o) in block[..BLOCK_LEN].iter_mut().zip(&other[..BLOCK_LEN]) {
        *b ^= o;
    }
}

/// Reads until `buf` is full or the reader reports EOF.
///
/// Returns the number of bytes read; anything less than `buf.len()` means EOF.
/// Unlike [`Read::read_exact`] a short read is not an error.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
