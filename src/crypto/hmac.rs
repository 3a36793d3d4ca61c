// src/crypto/hmac.rs

//! HMAC-SHA256 construction and tag comparison.

use crate::aliases::{HmacSha256, MacKey};
use crate::error::{BackupError, Pass};
use hmac::Mac;
use subtle::ConstantTimeEq;

/// Start a fresh HMAC-SHA256 accumulator keyed with `mac_key`.
///
/// Every pass gets its own accumulator; running state is never shared
/// between the verify and decrypt passes.
#[inline]
pub fn new_hmac(mac_key: &MacKey, pass: Pass) -> Result<HmacSha256, BackupError> {
    <HmacSha256 as Mac>::new_from_slice(mac_key.expose_secret()).map_err(|_| {
        BackupError::Cipher {
            pass,
            reason: "MAC key rejected by HMAC-SHA256".into(),
        }
    })
}

/// Compare two tags without short-circuiting on the first differing byte.
///
/// Lengths are public (a tag is always 32 bytes) so a length mismatch returns
/// `false` immediately; the byte comparison itself runs in constant time.
#[inline]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
