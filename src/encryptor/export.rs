//! src/encryptor/export.rs
//! Export pipeline — records → gzip → padding → AES-256-CBC → IV prefix → HMAC

use crate::aliases::Iv16;
use crate::config::BackupConfig;
use crate::consts::MAC_LEN;
use crate::crypto::SecureRandomExt;
use crate::encryptor::stream::encrypt_stream;
use crate::encryptor::write::{write_iv, MacWriter};
use crate::error::{BackupError, Pass};
use crate::keys::KeyMaterial;
use crate::padding::PaddingReader;
use crate::records::{FramedRecords, RecordSource};
use flate2::read::GzEncoder;
use flate2::Compression;
use std::io::Write;
use tracing::debug;

/// Sizes observed while writing one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    /// Records taken from the source.
    pub records: u64,
    /// Framed record stream length (length prefixes included).
    pub framed_len: u64,
    /// Length of the gzip member.
    pub compressed_len: u64,
    /// Compressed length after size-bucket padding.
    pub padded_len: u64,
    /// Total envelope length: IV + ciphertext + MAC.
    pub envelope_len: u64,
}

/// Write a complete envelope for `records` to `sink` under a fresh random IV.
///
/// The whole chain is pull-driven from the cipher stage, so no stage holds
/// more than one chunk. On error the sink holds a partial envelope that the
/// caller must discard.
pub fn export_envelope<S, W>(
    records: S,
    sink: W,
    keys: &KeyMaterial,
    config: &BackupConfig,
) -> Result<ExportSummary, BackupError>
where
    S: RecordSource,
    W: Write,
{
    let iv = Iv16::try_random()?;
    export_envelope_with_iv(records, sink, keys, &iv, config)
}

/// Same as [`export_envelope`] with a caller-chosen IV.
///
/// Reusing an IV under the same key breaks CBC confidentiality, so this stays
/// crate-private and exists for deterministic tests.
pub(crate) fn export_envelope_with_iv<S, W>(
    records: S,
    sink: W,
    keys: &KeyMaterial,
    iv: &Iv16,
    config: &BackupConfig,
) -> Result<ExportSummary, BackupError>
where
    S: RecordSource,
    W: Write,
{
    let framed = FramedRecords::new(records, config.max_record_len);
    let compressed = GzEncoder::new(framed, Compression::new(config.compression_level));
    let mut padded = PaddingReader::new(compressed);

    let mut mac_writer = MacWriter::new(sink, keys.new_hmac(Pass::Export)?);
    write_iv(&mut mac_writer, iv)?;
    debug!("export: IV written, streaming ciphertext");

    let ciphertext_len = encrypt_stream(
        &mut padded,
        &mut mac_writer,
        iv,
        keys.cipher_key(),
        config.block_chunk(),
    )?;
    let authenticated_len = mac_writer.authenticated_len();
    mac_writer.finish()?;

    let framed = padded.get_ref().get_ref();
    let summary = ExportSummary {
        records: framed.records(),
        framed_len: framed.framed_len(),
        compressed_len: padded.content_len(),
        padded_len: padded.padded_len().unwrap_or(padded.content_len()),
        envelope_len: authenticated_len + MAC_LEN as u64,
    };
    debug!(
        ciphertext_len,
        padded_len = summary.padded_len,
        "export: MAC appended"
    );
    Ok(summary)
}
