// src/crypto/rng.rs
//! Secure randomness for fixed-size secrets
//!
//! Adds `T::try_random()` to every `SpanBuffer<N>` (`Iv16`, `Aes256Key32`, …)
//! backed by the operating system CSPRNG.

use crate::error::{BackupError, Pass};
use rand::{rngs::OsRng, TryRngCore};
use secure_gate::Fixed;

/// Extension trait – gives `.try_random()` to all fixed-size secret types
pub trait SecureRandomExt: Sized {
    /// Generate a cryptographically secure random instance of this type.
    ///
    /// Fails only when the OS entropy source is unavailable.
    fn try_random() -> Result<Self, BackupError>;
}

/// Blanket impl – every `Fixed<[u8; N]>` gets `.try_random()`
impl<const N: usize> SecureRandomExt for Fixed<[u8; N]> {
    #[inline]
    fn try_random() -> Result<Self, BackupError> {
        let mut out = Fixed::new([0u8; N]);
        OsRng
            .try_fill_bytes(out.expose_secret_mut())
            .map_err(|e| BackupError::Cipher {
                pass: Pass::Export,
                reason: format!("OS random source unavailable: {e}"),
            })?;
        Ok(out)
    }
}
