//! src/decryptor/stream/trailer.rs
//! Trailer splitting: hold back the final 32 bytes as the MAC tag and
//! authenticate everything in front of them.

use crate::aliases::{HmacSha256, MacTag32};
use crate::consts::{ENVELOPE_MIN_LEN, MAC_LEN};
use crate::crypto::constant_time_eq;
use crate::error::{BackupError, Pass, Stage};
use hmac::Mac;
use std::io::{self, Read};

/// Computed and observed tags for one walk over an envelope.
pub struct MacOutcome {
    pub computed: MacTag32,
    pub observed: MacTag32,
    /// Authenticated bytes (IV + ciphertext).
    pub payload_len: u64,
}

impl MacOutcome {
    /// Constant-time tag comparison.
    pub fn is_valid(&self) -> bool {
        constant_time_eq(self.computed.expose_secret(), self.observed.expose_secret())
    }
}

/// [`Read`] adapter over a raw envelope.
///
/// Yields `IV ‖ ciphertext` and feeds it to the HMAC on the way through. The
/// last [`MAC_LEN`] bytes of the stream are never released; since the stream
/// length is unknown, every read keeps that many bytes in reserve until the
/// source reports EOF.
pub struct TrailerSplitter<R> {
    inner: R,
    hmac: HmacSha256,
    pass: Pass,
    pending: Vec<u8>,
    start: usize,
    chunk_len: usize,
    eof: bool,
    released: u64,
}

impl<R: Read> TrailerSplitter<R> {
    pub fn new(inner: R, hmac: HmacSha256, chunk_len: usize, pass: Pass) -> Self {
        let chunk_len = chunk_len.max(MAC_LEN);
        Self {
            inner,
            hmac,
            pass,
            pending: Vec::with_capacity(chunk_len + MAC_LEN),
            start: 0,
            chunk_len,
            eof: false,
            released: 0,
        }
    }

    /// Drain whatever the consumer left unread, then split off the tag.
    ///
    /// Anything shorter than a minimal envelope (IV, one cipher block, tag)
    /// never carried a MAC and is reported as missing authentication.
    pub fn finish(mut self) -> Result<MacOutcome, BackupError> {
        io::copy(&mut self, &mut io::sink()).map_err(BackupError::io(self.pass, Stage::Source))?;

        let held = &self.pending[self.start..];
        if held.len() < MAC_LEN || self.released + (MAC_LEN as u64) < ENVELOPE_MIN_LEN as u64 {
            return Err(BackupError::MissingAuthentication { pass: self.pass });
        }

        let mut observed = MacTag32::new([0u8; MAC_LEN]);
        observed.expose_secret_mut().copy_from_slice(held);
        let computed = MacTag32::new(self.hmac.finalize().into_bytes().into());

        Ok(MacOutcome {
            computed,
            observed,
            payload_len: self.released,
        })
    }

    fn fill(&mut self) -> io::Result<()> {
        self.pending.drain(..self.start);
        self.start = 0;

        let old = self.pending.len();
        self.pending.resize(old + self.chunk_len, 0);
        let n = loop {
            match self.inner.read(&mut self.pending[old..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.pending.truncate(old);
                    return Err(BackupError::from_io(e, self.pass, Stage::Source).into_io());
                }
            }
        };
        self.pending.truncate(old + n);
        self.eof = n == 0;
        Ok(())
    }
}

impl<R: Read> Read for TrailerSplitter<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        loop {
            let available = self.pending.len() - self.start;
            if available > MAC_LEN {
                let n = (available - MAC_LEN).min(out.len());
                let released = &self.pending[self.start..self.start + n];
                out[..n].copy_from_slice(released);
                self.hmac.update(released);
                self.start += n;
                self.released += n as u64;
                return Ok(n);
            }
            if self.eof {
                return Ok(0);
            }
            self.fill()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aliases::MacKey;
    use crate::crypto::new_hmac;
    use std::io::Cursor;

    fn hmac() -> HmacSha256 {
        new_hmac(&MacKey::new(vec![0x42; 32]), Pass::Verify).unwrap()
    }

    fn envelope(payload_len: usize) -> (Vec<u8>, Vec<u8>) {
        let payload: Vec<u8> = (0..payload_len).map(|i| i as u8).collect();
        let mut mac = hmac();
        mac.update(&payload);
        let tag = mac.finalize().into_bytes().to_vec();
        let mut data = payload.clone();
        data.extend_from_slice(&tag);
        (data, payload)
    }

    #[test]
    fn releases_everything_but_the_tag() {
        for chunk_len in [1, 7, 32, 33, 4096] {
            let (data, payload) = envelope(100);
            let mut splitter = TrailerSplitter::new(Cursor::new(data), hmac(), chunk_len, Pass::Verify);
            let mut out = Vec::new();
            splitter.read_to_end(&mut out).unwrap();
            assert_eq!(out, payload, "chunk {chunk_len}");

            let outcome = splitter.finish().unwrap();
            assert!(outcome.is_valid());
            assert_eq!(outcome.payload_len, 100);
        }
    }

    #[test]
    fn finish_drains_unread_payload() {
        let (data, _) = envelope(5000);
        let splitter = TrailerSplitter::new(Cursor::new(data), hmac(), 64, Pass::Verify);
        let outcome = splitter.finish().unwrap();
        assert!(outcome.is_valid());
        assert_eq!(outcome.payload_len, 5000);
    }

    #[test]
    fn flipped_tag_bit_is_detected() {
        let (mut data, _) = envelope(64);
        let last = data.len() - 1;
        data[last] ^= 0x01;
        let outcome = TrailerSplitter::new(Cursor::new(data), hmac(), 64, Pass::Verify)
            .finish()
            .unwrap();
        assert!(!outcome.is_valid());
    }

    #[test]
    fn short_streams_have_no_tag() {
        for len in [0usize, 1, 16, 31, 32, 47] {
            let err = TrailerSplitter::new(Cursor::new(vec![0u8; len]), hmac(), 64, Pass::Verify)
                .finish()
                .err()
                .unwrap();
            assert!(
                matches!(err, BackupError::MissingAuthentication { pass: Pass::Verify }),
                "len {len}: {err:?}"
            );
        }
    }
}
