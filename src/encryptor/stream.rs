//! src/encryptor/stream.rs
//! AES-256-CBC streaming encryption with PKCS#7 block padding

use crate::aliases::{Aes256Key32, ChunkBuffer, Iv16};
use crate::consts::BLOCK_LEN;
use crate::error::{BackupError, Pass, Stage};
use crate::utils::{read_full, xor_in_place};
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes256Enc, Block as AesBlock};
use std::io::{Read, Write};

/// Encrypt everything `source` yields and write the ciphertext to `destination`.
///
/// Reads `chunk_len` bytes (a multiple of 16) at a time, so memory stays flat
/// regardless of input size. The final block always carries PKCS#7 padding,
/// which means an input that is already block aligned gains a full padding block.
///
/// The IV is *not* written here; the caller prepends it. Returns the number of
/// ciphertext bytes written.
#[inline]
pub fn encrypt_stream<R, W>(
    mut source: R,
    mut destination: W,
    iv: &Iv16,
    key: &Aes256Key32,
    chunk_len: usize,
) -> Result<u64, BackupError>
where
    R: Read,
    W: Write,
{
    debug_assert!(chunk_len >= BLOCK_LEN && chunk_len % BLOCK_LEN == 0);

    let cipher = Aes256Enc::new(key.expose_secret().into());

    // previous ciphertext block, seeded with the IV
    let mut prev_block = [0u8; BLOCK_LEN];
    prev_block.copy_from_slice(iv.expose_secret());

    // one spare block so the PKCS#7 trailer always fits
    let mut buffer = ChunkBuffer::new(vec![0u8; chunk_len + BLOCK_LEN]);
    let mut written = 0u64;

    loop {
        let buf = buffer.expose_secret_mut();
        let n = read_full(&mut source, &mut buf[..chunk_len])
            .map_err(BackupError::io(Pass::Export, Stage::Compression))?;

        let is_final = n < chunk_len;
        let mut len = n;
        if is_final {
            let pad = BLOCK_LEN - (n % BLOCK_LEN);
            buf[n..n + pad].fill(pad as u8);
            len = n + pad;
        }

        for block in buf[..len].chunks_exact_mut(BLOCK_LEN) {
            xor_in_place(block, &prev_block);
            cipher.encrypt_block(AesBlock::from_mut_slice(block));
            prev_block.copy_from_slice(block);
        }

        destination
            .write_all(&buf[..len])
            .map_err(BackupError::io(Pass::Export, Stage::Sink))?;
        written += len as u64;

        if is_final {
            break;
        }
    }

    Ok(written)
}
