//! # Decryption Context
//!
//! Streaming AES-256-CBC decryption exposed as a [`Read`] adapter, so the gzip
//! decoder can pull plaintext straight out of the ciphertext stream.
//!
//! The PKCS#7 trailer can only be stripped from the *last* block, and the last
//! block is only known once the ciphertext ends. The reader therefore always
//! holds back the most recently decrypted block and releases it when the next
//! ciphertext block arrives; at EOF the held block is unpadded and emitted.

use crate::aliases::{Aes256Key32, ChunkBuffer, Iv16};
use crate::consts::BLOCK_LEN;
use crate::error::{BackupError, Pass};
use crate::utils::{read_full, xor_in_place};
use aes::cipher::{BlockDecrypt, KeyInit};
use aes::{Aes256Dec, Block as AesBlock};
use secure_gate::Fixed;
use std::io::{self, Read};
use subtle::ConstantTimeEq;

/// Pull-based CBC decryption stage.
pub struct CbcDecryptReader<R> {
    inner: R,
    cipher: Aes256Dec,
    pass: Pass,
    /// Previous ciphertext block (starts as the IV).
    prev_block: [u8; BLOCK_LEN],
    /// Last plaintext block, not yet released.
    held: Option<Fixed<[u8; BLOCK_LEN]>>,
    /// Ciphertext in, plaintext out; reused for every chunk.
    chunk: ChunkBuffer,
    chunk_len: usize,
    /// Plaintext ready for the caller: `chunk[out_pos..out_len]`.
    out_pos: usize,
    out_len: usize,
    finished: bool,
    /// Set once decryption fails; every later read repeats it.
    failure: Option<&'static str>,
    ciphertext_len: u64,
}

impl<R: Read> CbcDecryptReader<R> {
    /// `chunk_len` must be a positive multiple of 16.
    pub fn new(inner: R, key: &Aes256Key32, iv: &Iv16, chunk_len: usize, pass: Pass) -> Self {
        debug_assert!(chunk_len >= BLOCK_LEN && chunk_len % BLOCK_LEN == 0);
        let mut prev_block = [0u8; BLOCK_LEN];
        prev_block.copy_from_slice(iv.expose_secret());
        Self {
            inner,
            cipher: Aes256Dec::new(key.expose_secret().into()),
            pass,
            prev_block,
            held: None,
            // one spare block: a chunk may release the held block plus its own
            chunk: ChunkBuffer::new(vec![0u8; chunk_len + BLOCK_LEN]),
            chunk_len,
            out_pos: 0,
            out_len: 0,
            finished: false,
            failure: None,
            ciphertext_len: 0,
        }
    }

    /// Ciphertext bytes consumed so far.
    pub fn ciphertext_len(&self) -> u64 {
        self.ciphertext_len
    }

    fn cipher_error(&self, reason: &str) -> io::Error {
        BackupError::Cipher {
            pass: self.pass,
            reason: reason.into(),
        }
        .into_io()
    }

    fn fail(&mut self, reason: &'static str) -> io::Error {
        self.failure = Some(reason);
        self.cipher_error(reason)
    }

    /// Decrypt the next chunk into the output window.
    fn refill(&mut self) -> io::Result<()> {
        self.out_pos = 0;
        self.out_len = 0;

        // Ciphertext is read into the tail of the buffer so released plaintext
        // (one block behind) can be written to the head without overlap issues.
        let buf = self.chunk.expose_secret_mut();
        let n = read_full(&mut self.inner, &mut buf[BLOCK_LEN..BLOCK_LEN + self.chunk_len])?;
        self.ciphertext_len += n as u64;
        let at_eof = n < self.chunk_len;

        if n % BLOCK_LEN != 0 {
            return Err(self.fail("ciphertext is not a multiple of the AES block size"));
        }

        let mut out_len = 0;
        for offset in (BLOCK_LEN..BLOCK_LEN + n).step_by(BLOCK_LEN) {
            let mut block = [0u8; BLOCK_LEN];
            block.copy_from_slice(&buf[offset..offset + BLOCK_LEN]);
            let ciphertext = block;

            self.cipher.decrypt_block(AesBlock::from_mut_slice(&mut block));
            xor_in_place(&mut block, &self.prev_block);
            self.prev_block = ciphertext;

            if let Some(released) = self.held.replace(Fixed::new(block)) {
                buf[out_len..out_len + BLOCK_LEN].copy_from_slice(released.expose_secret());
                out_len += BLOCK_LEN;
            }
        }

        if at_eof {
            let Some(last) = self.held.take() else {
                return Err(self.fail("ciphertext is empty"));
            };
            let last = last.expose_secret();
            let pad = last[BLOCK_LEN - 1];
            if pad == 0 || pad as usize > BLOCK_LEN {
                return Err(self.fail("invalid PKCS#7 padding"));
            }
            let keep = BLOCK_LEN - pad as usize;
            let expected = [pad; BLOCK_LEN];
            if !bool::from(last[keep..].ct_eq(&expected[keep..])) {
                return Err(self.fail("corrupt PKCS#7 padding"));
            }
            buf[out_len..out_len + keep].copy_from_slice(&last[..keep]);
            out_len += keep;
            self.finished = true;
        }

        self.out_len = out_len;
        Ok(())
    }
}

impl<R: Read> Read for CbcDecryptReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        if let Some(reason) = self.failure {
            return Err(self.cipher_error(reason));
        }
        while self.out_pos == self.out_len {
            if self.finished {
                return Ok(0);
            }
            self.refill()?;
        }
        let n = (self.out_len - self.out_pos).min(out.len());
        out[..n].copy_from_slice(&self.chunk.expose_secret()[self.out_pos..self.out_pos + n]);
        self.out_pos += n;
        Ok(n)
    }
}
