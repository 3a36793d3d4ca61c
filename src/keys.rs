//! # Key Material
//!
//! The pipeline consumes a 32-byte AES-256 cipher key and a separate HMAC key.
//! Where they come from is the caller's business: anything implementing
//! [`KeyProvider`] can feed a [`BackupService`](crate::BackupService).
//!
//! Two providers ship with the crate:
//!
//! - [`StaticKeys`] — caller-supplied key bytes (tests, HSM-unwrapped keys, …)
//! - [`PassphraseKeys`] — deterministic PBKDF2-HMAC-SHA512 derivation from an
//!   account secret and salt

use crate::aliases::{AccountSecret, Aes256Key32, DerivedKeys64, HmacSha256, MacKey, Salt16};
use crate::consts::{CIPHER_KEY_LEN, DEFAULT_PBKDF2_ITERATIONS, PBKDF2_MAX_ITER, PBKDF2_MIN_ITER};
use crate::crypto::kdf::pbkdf2::derive_pbkdf2_keys;
use crate::crypto::{constant_time_eq, new_hmac};
use crate::error::{BackupError, Pass};
use std::fmt;

/// Cipher key + MAC key for exactly one export or import.
///
/// Never persisted by this crate and wiped on drop.
pub struct KeyMaterial {
    cipher_key: Aes256Key32,
    mac_key: MacKey,
}

impl KeyMaterial {
    /// Wrap already-secured keys.
    ///
    /// # Errors
    ///
    /// [`BackupError::KeyMaterial`] if the MAC key is empty or equal to the
    /// cipher key. Encrypt-then-MAC needs two independent keys.
    pub fn new(cipher_key: Aes256Key32, mac_key: MacKey) -> Result<Self, BackupError> {
        if mac_key.expose_secret().is_empty() {
            return Err(BackupError::KeyMaterial("MAC key must not be empty".into()));
        }
        if constant_time_eq(mac_key.expose_secret(), cipher_key.expose_secret()) {
            return Err(BackupError::KeyMaterial(
                "MAC key must differ from the cipher key".into(),
            ));
        }
        Ok(Self {
            cipher_key,
            mac_key,
        })
    }

    /// Convenience constructor from raw bytes.
    pub fn from_bytes(cipher_key: [u8; CIPHER_KEY_LEN], mac_key: &[u8]) -> Result<Self, BackupError> {
        Self::new(Aes256Key32::new(cipher_key), MacKey::new(mac_key.to_vec()))
    }

    #[inline]
    pub fn cipher_key(&self) -> &Aes256Key32 {
        &self.cipher_key
    }

    #[inline]
    pub fn mac_key(&self) -> &MacKey {
        &self.mac_key
    }

    /// Fresh HMAC accumulator for one pass.
    #[inline]
    pub(crate) fn new_hmac(&self, pass: Pass) -> Result<HmacSha256, BackupError> {
        new_hmac(&self.mac_key, pass)
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("cipher_key", &"[REDACTED]")
            .field("mac_key", &"[REDACTED]")
            .finish()
    }
}

/// Source of key material, asked once at the start of every operation.
pub trait KeyProvider {
    fn key_material(&self) -> Result<KeyMaterial, BackupError>;
}

impl<P: KeyProvider + ?Sized> KeyProvider for &P {
    fn key_material(&self) -> Result<KeyMaterial, BackupError> {
        (**self).key_material()
    }
}

impl<P: KeyProvider + ?Sized> KeyProvider for std::sync::Arc<P> {
    fn key_material(&self) -> Result<KeyMaterial, BackupError> {
        (**self).key_material()
    }
}

/// Fixed key bytes handed out as a fresh [`KeyMaterial`] copy per operation.
pub struct StaticKeys {
    cipher_key: Aes256Key32,
    mac_key: MacKey,
}

impl StaticKeys {
    /// Validates the pair up front so a bad configuration fails at startup
    /// instead of on the first export.
    pub fn new(cipher_key: [u8; CIPHER_KEY_LEN], mac_key: Vec<u8>) -> Result<Self, BackupError> {
        let checked = KeyMaterial::new(Aes256Key32::new(cipher_key), MacKey::new(mac_key))?;
        Ok(Self {
            cipher_key: checked.cipher_key,
            mac_key: checked.mac_key,
        })
    }
}

impl KeyProvider for StaticKeys {
    fn key_material(&self) -> Result<KeyMaterial, BackupError> {
        KeyMaterial::new(
            Aes256Key32::new(*self.cipher_key.expose_secret()),
            MacKey::new(self.mac_key.expose_secret().clone()),
        )
    }
}

impl fmt::Debug for StaticKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticKeys([REDACTED])")
    }
}

/// Derives both keys from an account secret with PBKDF2-HMAC-SHA512.
///
/// Deterministic: the same secret, salt and iteration count always yield the
/// same keys, so a backup exported on one device imports on another.
pub struct PassphraseKeys {
    secret: AccountSecret,
    salt: Salt16,
    iterations: u32,
}

impl PassphraseKeys {
    /// Uses [`DEFAULT_PBKDF2_ITERATIONS`].
    pub fn new(secret: AccountSecret, salt: [u8; 16]) -> Result<Self, BackupError> {
        Self::with_iterations(secret, salt, DEFAULT_PBKDF2_ITERATIONS)
    }

    pub fn with_iterations(
        secret: AccountSecret,
        salt: [u8; 16],
        iterations: u32,
    ) -> Result<Self, BackupError> {
        if secret.expose_secret().is_empty() {
            return Err(BackupError::KeyMaterial("empty account secret".into()));
        }
        if !(PBKDF2_MIN_ITER..=PBKDF2_MAX_ITER).contains(&iterations) {
            return Err(BackupError::KeyMaterial(format!(
                "PBKDF2 iterations must be in {PBKDF2_MIN_ITER}..={PBKDF2_MAX_ITER}, got {iterations}"
            )));
        }
        Ok(Self {
            secret,
            salt: Salt16::new(salt),
            iterations,
        })
    }

    #[must_use]
    pub const fn iterations(&self) -> u32 {
        self.iterations
    }
}

impl KeyProvider for PassphraseKeys {
    fn key_material(&self) -> Result<KeyMaterial, BackupError> {
        let mut derived = DerivedKeys64::new([0u8; 64]);
        derive_pbkdf2_keys(&self.secret, &self.salt, self.iterations, &mut derived)?;

        let bytes = derived.expose_secret();
        let mut cipher_key = Aes256Key32::new([0u8; CIPHER_KEY_LEN]);
        cipher_key
            .expose_secret_mut()
            .copy_from_slice(&bytes[..CIPHER_KEY_LEN]);
        let mac_key = MacKey::new(bytes[CIPHER_KEY_LEN..].to_vec());

        KeyMaterial::new(cipher_key, mac_key)
    }
}

impl fmt::Debug for PassphraseKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassphraseKeys")
            .field("secret", &"[REDACTED]")
            .field("iterations", &self.iterations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_shared_key() {
        let key = [0x42u8; 32];
        let err = KeyMaterial::from_bytes(key, &key).unwrap_err();
        assert!(matches!(err, BackupError::KeyMaterial(_)));
    }

    #[test]
    fn rejects_empty_mac_key() {
        let err = KeyMaterial::from_bytes([1u8; 32], &[]).unwrap_err();
        assert!(err.to_string().contains("MAC key must not be empty"));
    }

    #[test]
    fn static_keys_hand_out_copies() {
        let keys = StaticKeys::new([1u8; 32], vec![2u8; 32]).unwrap();
        let a = keys.key_material().unwrap();
        let b = keys.key_material().unwrap();
        assert_eq!(a.cipher_key().expose_secret(), b.cipher_key().expose_secret());
        assert_eq!(a.mac_key().expose_secret(), b.mac_key().expose_secret());
    }

    #[test]
    fn passphrase_keys_are_deterministic_and_split() {
        let keys = PassphraseKeys::with_iterations(
            AccountSecret::new("correct horse battery staple".to_string()),
            [9u8; 16],
            10,
        )
        .unwrap();
        let a = keys.key_material().unwrap();
        let b = keys.key_material().unwrap();
        assert_eq!(a.cipher_key().expose_secret(), b.cipher_key().expose_secret());
        assert_eq!(a.mac_key().expose_secret().len(), 32);
        assert_ne!(
            &a.cipher_key().expose_secret()[..],
            a.mac_key().expose_secret().as_slice()
        );
    }

    #[test]
    fn debug_output_is_redacted() {
        let keys = StaticKeys::new([0xAAu8; 32], vec![0xBB; 32]).unwrap();
        let material = keys.key_material().unwrap();
        let shown = format!("{keys:?} {material:?}");
        assert!(!shown.contains("170"), "raw key bytes leaked: {shown}");
        assert!(shown.contains("REDACTED"));
    }
}
