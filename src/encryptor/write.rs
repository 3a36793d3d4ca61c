//! src/encryptor/write.rs
//! Envelope write helpers: IV prefix and the trailing MAC stage

use crate::aliases::{HmacSha256, Iv16, MacTag32};
use crate::error::{BackupError, Pass, Stage};
use hmac::Mac;
use std::io::{self, Write};

/// Write the cleartext IV that opens every envelope.
#[inline]
pub fn write_iv<W: Write>(writer: &mut W, iv: &Iv16) -> Result<(), BackupError> {
    writer
        .write_all(iv.expose_secret())
        .map_err(BackupError::io(Pass::Export, Stage::Sink))
}

/// MAC stage: authenticates every byte on its way to the sink and appends the
/// 32-byte tag in [`finish`](Self::finish).
///
/// Holds no data of its own; backpressure from the sink reaches the writer
/// directly.
pub struct MacWriter<W> {
    inner: W,
    hmac: HmacSha256,
    written: u64,
}

impl<W: Write> MacWriter<W> {
    pub fn new(inner: W, hmac: HmacSha256) -> Self {
        Self {
            inner,
            hmac,
            written: 0,
        }
    }

    /// Bytes authenticated so far (IV + ciphertext).
    pub fn authenticated_len(&self) -> u64 {
        self.written
    }

    /// Append the tag, flush, and hand back the sink with the tag that was written.
    pub fn finish(mut self) -> Result<(W, MacTag32), BackupError> {
        let tag = MacTag32::new(self.hmac.finalize().into_bytes().into());
        self.inner
            .write_all(tag.expose_secret())
            .and_then(|()| self.inner.flush())
            .map_err(BackupError::io(Pass::Export, Stage::Mac))?;
        Ok((self.inner, tag))
    }
}

impl<W: Write> Write for MacWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hmac.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
