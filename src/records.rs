//! # Record Stream Boundary
//!
//! The envelope wraps an opaque, ordered stream of records. This module owns
//! only the framing: each record travels as a 4-byte big-endian length followed
//! by that many bytes. What a record *means* belongs to the caller.
//!
//! - [`RecordSource`] feeds export; any `Iterator<Item = Vec<u8>>` is one.
//! - [`RecordSink`] receives records on import. It is transactional: records
//!   delivered before [`commit`](RecordSink::commit) are unverified and
//!   [`abort`](RecordSink::abort) must roll them back.
//! - [`QuarantineSink`] adapts a sink that cannot roll back by holding every
//!   record in memory until the import is fully authenticated.

use crate::consts::RECORD_LEN_PREFIX;
use crate::error::{BackupError, Pass, Stage};
use std::io::{self, Read};

/// Producer of serialized backup records.
pub trait RecordSource {
    /// Next record, or `None` once the stream is exhausted.
    fn next_record(&mut self) -> Result<Option<Vec<u8>>, BackupError>;
}

impl<I> RecordSource for I
where
    I: Iterator<Item = Vec<u8>>,
{
    fn next_record(&mut self) -> Result<Option<Vec<u8>>, BackupError> {
        Ok(self.next())
    }
}

/// Transactional consumer of decrypted records.
pub trait RecordSink {
    /// Accept one record. The import has not been re-authenticated yet.
    fn write_record(&mut self, record: &[u8]) -> Result<(), BackupError>;

    /// Called once, only after the pass-2 MAC check succeeded.
    fn commit(&mut self) -> Result<(), BackupError>;

    /// Called once if the import fails after records may have been written.
    fn abort(&mut self);
}

/// Collects records in memory; `abort` clears them.
impl RecordSink for Vec<Vec<u8>> {
    fn write_record(&mut self, record: &[u8]) -> Result<(), BackupError> {
        self.push(record.to_vec());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), BackupError> {
        Ok(())
    }

    fn abort(&mut self) {
        self.clear();
    }
}

/// Buffers records until the import is authenticated, then replays them into
/// the inner sink. The inner sink never sees unverified output.
///
/// Memory grows with the backup, so use it only where rollback is impossible.
#[derive(Debug)]
pub struct QuarantineSink<S> {
    inner: S,
    held: Vec<Vec<u8>>,
    held_bytes: usize,
}

impl<S: RecordSink> QuarantineSink<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            held: Vec::new(),
            held_bytes: 0,
        }
    }

    /// Records waiting for verification.
    pub fn pending(&self) -> usize {
        self.held.len()
    }

    pub fn pending_bytes(&self) -> usize {
        self.held_bytes
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: RecordSink> RecordSink for QuarantineSink<S> {
    fn write_record(&mut self, record: &[u8]) -> Result<(), BackupError> {
        self.held_bytes += record.len();
        self.held.push(record.to_vec());
        Ok(())
    }

    /// On error the inner sink is left for the caller's single `abort`.
    fn commit(&mut self) -> Result<(), BackupError> {
        self.held_bytes = 0;
        for record in self.held.drain(..) {
            self.inner.write_record(&record)?;
        }
        self.inner.commit()
    }

    fn abort(&mut self) {
        self.held.clear();
        self.held_bytes = 0;
        self.inner.abort();
    }
}

/// Export-side framing: turns a [`RecordSource`] into a byte stream.
pub struct FramedRecords<S> {
    source: S,
    max_record_len: u32,
    frame: Vec<u8>,
    pos: usize,
    records: u64,
    framed_len: u64,
    done: bool,
}

impl<S: RecordSource> FramedRecords<S> {
    pub fn new(source: S, max_record_len: u32) -> Self {
        Self {
            source,
            max_record_len,
            frame: Vec::new(),
            pos: 0,
            records: 0,
            framed_len: 0,
            done: false,
        }
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    /// Total framed bytes produced (prefixes included).
    pub fn framed_len(&self) -> u64 {
        self.framed_len
    }

    fn load_next(&mut self) -> Result<(), BackupError> {
        self.frame.clear();
        self.pos = 0;
        let Some(record) = self.source.next_record()? else {
            self.done = true;
            return Ok(());
        };
        let len = u32::try_from(record.len())
            .ok()
            .filter(|&len| len <= self.max_record_len)
            .ok_or_else(|| BackupError::MalformedContainer {
                pass: Pass::Export,
                stage: Stage::Records,
                reason: format!(
                    "record {} is {} bytes, limit is {}",
                    self.records,
                    record.len(),
                    self.max_record_len
                ),
            })?;
        self.frame.reserve(RECORD_LEN_PREFIX + record.len());
        self.frame.extend_from_slice(&len.to_be_bytes());
        self.frame.extend_from_slice(&record);
        self.records += 1;
        Ok(())
    }
}

impl<S: RecordSource> Read for FramedRecords<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos == self.frame.len() {
            if self.done || buf.is_empty() {
                return Ok(0);
            }
            self.load_next().map_err(BackupError::into_io)?;
        }
        let n = (self.frame.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.frame[self.pos..self.pos + n]);
        self.pos += n;
        self.framed_len += n as u64;
        Ok(n)
    }
}

/// Import-side framing: split `reader` into records and hand them to `sink`.
///
/// `reader` is the gzip decoder, so errors it raises on its own are reported
/// as a malformed compression container. Returns the number of records.
pub fn read_records<R, S>(
    reader: &mut R,
    sink: &mut S,
    max_record_len: u32,
    pass: Pass,
) -> Result<u64, BackupError>
where
    R: Read + ?Sized,
    S: RecordSink + ?Sized,
{
    let mut count = 0u64;
    let mut record = Vec::new();

    loop {
        let mut prefix = [0u8; RECORD_LEN_PREFIX];
        let got = crate::utils::read_full(reader, &mut prefix)
            .map_err(|e| BackupError::from_decompress_io(e, pass))?;
        if got == 0 {
            return Ok(count);
        }
        if got < RECORD_LEN_PREFIX {
            return Err(malformed_records(
                pass,
                format!("stream ends inside the length prefix of record {count}"),
            ));
        }

        let len = u32::from_be_bytes(prefix);
        if len > max_record_len {
            return Err(malformed_records(
                pass,
                format!("record {count} claims {len} bytes, limit is {max_record_len}"),
            ));
        }

        record.resize(len as usize, 0);
        let got = crate::utils::read_full(reader, &mut record)
            .map_err(|e| BackupError::from_decompress_io(e, pass))?;
        if got < record.len() {
            return Err(malformed_records(
                pass,
                format!("record {count} truncated after {got} of {len} bytes"),
            ));
        }

        sink.write_record(&record)?;
        count += 1;
    }
}

fn malformed_records(pass: Pass, reason: String) -> BackupError {
    BackupError::MalformedContainer {
        pass,
        stage: Stage::Records,
        reason,
    }
}
