//! # Secure-Gate Type Aliases
//!
//! Secret-bearing buffers used throughout the pipeline. All of them are
//! [`secure-gate`](https://github.com/Slurp9187/secure-gate) wrappers: access needs an
//! explicit `.expose_secret()` / `.expose_secret_mut()` and, with the `zeroize`
//! feature, the memory is wiped on drop.
//!
//! ## Type Categories
//!
//! ### HMAC Primitives
//! - [`HmacSha256`] - envelope authentication
//! - [`HmacSha512`] - PRF for PBKDF2 key derivation
//!
//! ### Fixed-Size Secrets
//! - [`Aes256Key32`] - AES-256 cipher key
//! - [`Iv16`] - per-export CBC initialization vector
//! - [`MacTag32`] - HMAC-SHA256 tag (computed or observed)
//! - [`Salt16`] - PBKDF2 salt
//! - [`DerivedKeys64`] - raw PBKDF2 output before it is split
//!
//! ### Dynamic Secrets
//! - [`MacKey`] - HMAC key bytes (any length, never empty)
//! - [`AccountSecret`] - passphrase-like input for [`PassphraseKeys`](crate::PassphraseKeys)
//! - [`ChunkBuffer`] - streaming plaintext buffer

use hmac::Hmac;
use sha2::{Sha256, Sha512};

pub type HmacSha256 = Hmac<Sha256>;
pub type HmacSha512 = Hmac<Sha512>;

// ─────────────────────────────────────────────────────────────────────────────
// SpanBuffer — generic secure stack buffer (direct alias to secure-gate's Fixed)
// ─────────────────────────────────────────────────────────────────────────────
pub type SpanBuffer<const N: usize> = secure_gate::Fixed<[u8; N]>;

pub type Aes256Key32 = SpanBuffer<32>;
pub type DerivedKeys64 = SpanBuffer<64>; // cipher key ‖ MAC key
pub type Iv16 = SpanBuffer<16>;
pub type MacTag32 = SpanBuffer<32>;
pub type Salt16 = SpanBuffer<16>;

// ─────────────────────────────────────────────────────────────────────────────
// Dynamic secrets
// ─────────────────────────────────────────────────────────────────────────────
pub type AccountSecret = secure_gate::Dynamic<String>;
pub type ChunkBuffer = secure_gate::Dynamic<Vec<u8>>;
pub type MacKey = secure_gate::Dynamic<Vec<u8>>;
