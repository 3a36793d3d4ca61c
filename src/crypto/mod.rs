// src/crypto/mod.rs

//! Low-level crypto primitives: secure randomness, HMAC helpers and the
//! PBKDF2 key split used by [`PassphraseKeys`](crate::PassphraseKeys).
//!
//! HMAC types are defined in `aliases.rs`.

pub mod hmac;
pub mod kdf;
pub mod rng;

pub use self::hmac::{constant_time_eq, new_hmac};
pub use self::rng::SecureRandomExt;
