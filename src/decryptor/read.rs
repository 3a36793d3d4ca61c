//! src/decryptor/read.rs
//! Envelope sources: re-openable byte streams and the IV prefix

use crate::aliases::Iv16;
use crate::consts::IV_LEN;
use crate::error::{BackupError, Pass, Stage};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;

/// Opens the same envelope from the start, once per import pass.
///
/// Import reads the envelope twice, so a plain `Read` is not enough. Every
/// call must yield the same bytes; if it does not, the second MAC check fails
/// and the import is aborted.
pub trait SourceFactory {
    type Source: Read;

    fn open(&self) -> io::Result<Self::Source>;
}

impl<F, R> SourceFactory for F
where
    F: Fn() -> io::Result<R>,
    R: Read,
{
    type Source = R;

    fn open(&self) -> io::Result<R> {
        self()
    }
}

/// Factory that re-opens a file on every pass.
pub fn reopen_file(path: impl Into<PathBuf>) -> impl SourceFactory<Source = BufReader<File>> {
    let path = path.into();
    move || File::open(&path).map(BufReader::new)
}

/// Read exactly `N` bytes into a stack array.
///
/// A short stream means the envelope ended before its authenticated header.
#[inline(always)]
pub fn read_exact_span<R, const N: usize>(reader: &mut R, pass: Pass) -> Result<[u8; N], BackupError>
where
    R: Read + ?Sized,
{
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            BackupError::MissingAuthentication { pass }
        } else {
            BackupError::from_io(e, pass, Stage::Source)
        }
    })?;
    Ok(buf)
}

/// Read the cleartext IV that opens every envelope.
#[inline(always)]
pub fn read_iv<R>(reader: &mut R, pass: Pass) -> Result<Iv16, BackupError>
where
    R: Read + ?Sized,
{
    Ok(Iv16::new(read_exact_span::<_, IV_LEN>(reader, pass)?))
}
