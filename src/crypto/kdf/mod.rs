//! # Key Derivation
//!
//! [`pbkdf2`] turns an account secret and salt into the 64 bytes that become
//! the envelope's cipher key and MAC key.
//!
//! Most callers never touch this directly: [`PassphraseKeys`](crate::PassphraseKeys)
//! runs it once per export or import.

pub mod pbkdf2;
