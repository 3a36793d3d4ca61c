//! src/crypto/kdf/pbkdf2.rs

use crate::aliases::{AccountSecret, DerivedKeys64, HmacSha512, Salt16};
use crate::consts::{PBKDF2_MAX_ITER, PBKDF2_MIN_ITER};
use crate::error::BackupError;

use pbkdf2::pbkdf2;

/// Derive 64 bytes of PBKDF2-HMAC-SHA512 output directly into a secure buffer.
///
/// The first 32 bytes become the AES-256 cipher key, the last 32 the HMAC key,
/// so the two keys are independent outputs of one derivation.
#[inline]
pub fn derive_pbkdf2_keys(
    secret: &AccountSecret,
    salt: &Salt16,
    iterations: u32,
    out: &mut DerivedKeys64,
) -> Result<(), BackupError> {
    if !(PBKDF2_MIN_ITER..=PBKDF2_MAX_ITER).contains(&iterations) {
        return Err(BackupError::KeyMaterial(format!(
            "PBKDF2 iterations must be in {PBKDF2_MIN_ITER}..={PBKDF2_MAX_ITER}, got {iterations}"
        )));
    }
    if secret.expose_secret().is_empty() {
        return Err(BackupError::KeyMaterial("empty account secret".into()));
    }

    pbkdf2::<HmacSha512>(
        secret.expose_secret().as_bytes(),
        salt.expose_secret(),
        iterations,
        out.expose_secret_mut(),
    )
    .map_err(|e| BackupError::KeyMaterial(format!("PBKDF2 failed: {e}")))?;
    Ok(())
}
