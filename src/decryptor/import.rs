//! src/decryptor/import.rs
//! Two-pass authenticated import.
//!
//! Pass 1 authenticates the whole envelope and throws the payload away, so a
//! tampered backup is rejected before a single plaintext byte exists. Pass 2
//! opens the envelope again, decrypts it into the record sink and re-checks
//! the MAC over the bytes it actually decrypted. The sink only commits after
//! that second check.

use crate::aliases::{Iv16, MacTag32};
use crate::config::BackupConfig;
use crate::consts::MAC_LEN;
use crate::crypto::constant_time_eq;
use crate::decryptor::read::{read_iv, SourceFactory};
use crate::decryptor::stream::{CbcDecryptReader, TrailerSplitter};
use crate::error::{BackupError, Pass, Stage};
use crate::keys::KeyMaterial;
use crate::padding::strip_padding;
use crate::records::{read_records, RecordSink};
use flate2::bufread::GzDecoder;
use std::io::{BufReader, Read};
use tracing::{debug, error};

/// Where an [`ImportVerifier`] is in its walk over the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    Idle,
    Pass1Verifying,
    Pass1Done,
    Pass2Decrypting,
    Pass2Verifying,
    Complete,
    Failed,
}

impl ImportState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ImportState::Complete | ImportState::Failed)
    }

    fn can_advance_to(self, next: ImportState) -> bool {
        use ImportState::*;
        match (self, next) {
            (Idle | Complete | Failed, Pass1Verifying) => true,
            (Pass1Verifying, Pass1Done) => true,
            (Pass1Done, Pass2Decrypting) => true,
            (Pass2Decrypting, Pass2Verifying) => true,
            (Pass2Verifying, Complete) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// What a successful import saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    /// Records committed to the sink.
    pub records: u64,
    /// Envelope length: IV + ciphertext + MAC.
    pub envelope_len: u64,
    /// Ciphertext length (PKCS#7 block padding included).
    pub ciphertext_len: u64,
    /// Zero bytes found after the gzip member.
    pub padding_len: u64,
}

/// Drives one import through both passes.
pub struct ImportVerifier<'a, F, S: ?Sized> {
    factory: &'a F,
    sink: &'a mut S,
    keys: &'a KeyMaterial,
    config: &'a BackupConfig,
    state: ImportState,
}

struct Verified {
    their_mac: MacTag32,
    envelope_len: u64,
}

struct Decrypted {
    records: u64,
    ciphertext_len: u64,
    padding_len: u64,
}

impl<'a, F, S> ImportVerifier<'a, F, S>
where
    F: SourceFactory,
    S: RecordSink + ?Sized,
{
    pub fn new(factory: &'a F, sink: &'a mut S, keys: &'a KeyMaterial, config: &'a BackupConfig) -> Self {
        Self {
            factory,
            sink,
            keys,
            config,
            state: ImportState::Idle,
        }
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    /// Run both passes. The sink is committed on success and aborted on any
    /// failure after pass 2 started; pass-1 failures never touch it.
    pub fn run(&mut self) -> Result<ImportSummary, BackupError> {
        let verified = match self.verify_pass() {
            Ok(verified) => verified,
            Err(e) => {
                self.advance(ImportState::Failed);
                return Err(e);
            }
        };

        self.advance(ImportState::Pass2Decrypting);
        match self.decrypt_pass(&verified).and_then(|decrypted| {
            self.sink.commit()?;
            Ok(decrypted)
        }) {
            Ok(decrypted) => {
                self.advance(ImportState::Complete);
                Ok(ImportSummary {
                    records: decrypted.records,
                    envelope_len: verified.envelope_len,
                    ciphertext_len: decrypted.ciphertext_len,
                    padding_len: decrypted.padding_len,
                })
            }
            Err(e) => {
                self.sink.abort();
                self.advance(ImportState::Failed);
                Err(e)
            }
        }
    }

    fn advance(&mut self, next: ImportState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal import transition {:?} -> {next:?}",
            self.state
        );
        debug!(from = ?self.state, to = ?next, "import state");
        self.state = next;
    }

    fn verify_pass(&mut self) -> Result<Verified, BackupError> {
        self.advance(ImportState::Pass1Verifying);

        let source = self
            .factory
            .open()
            .map_err(BackupError::io(Pass::Verify, Stage::Source))?;
        let splitter = TrailerSplitter::new(
            source,
            self.keys.new_hmac(Pass::Verify)?,
            self.config.block_chunk(),
            Pass::Verify,
        );
        let outcome = splitter.finish()?;
        if !outcome.is_valid() {
            error!(payload_len = outcome.payload_len, "import pass 1: MAC mismatch");
            return Err(BackupError::AuthenticationFailed { pass: Pass::Verify });
        }

        self.advance(ImportState::Pass1Done);
        Ok(Verified {
            envelope_len: outcome.payload_len + MAC_LEN as u64,
            their_mac: outcome.observed,
        })
    }

    fn decrypt_pass(&mut self, verified: &Verified) -> Result<Decrypted, BackupError> {
        let source = self
            .factory
            .open()
            .map_err(BackupError::io(Pass::Decrypt, Stage::Source))?;
        let mut splitter = TrailerSplitter::new(
            source,
            self.keys.new_hmac(Pass::Decrypt)?,
            self.config.block_chunk(),
            Pass::Decrypt,
        );

        let decrypted = decrypt_records(&mut splitter, &mut *self.sink, self.keys, self.config);

        // The MAC check runs even after a stage error: if the bytes changed
        // since pass 1, that is what gets reported.
        self.advance(ImportState::Pass2Verifying);
        let outcome = splitter.finish();
        if let Ok(outcome) = &outcome {
            if !constant_time_eq(
                outcome.computed.expose_secret(),
                verified.their_mac.expose_secret(),
            ) {
                error!(payload_len = outcome.payload_len, "import pass 2: MAC mismatch");
                return Err(BackupError::AuthenticationFailed { pass: Pass::Decrypt });
            }
        }
        let decrypted = decrypted?;
        outcome?;
        Ok(decrypted)
    }
}

/// IV → CBC → gunzip → records, then the padding tail.
fn decrypt_records<R, S>(
    splitter: &mut TrailerSplitter<R>,
    sink: &mut S,
    keys: &KeyMaterial,
    config: &BackupConfig,
) -> Result<Decrypted, BackupError>
where
    R: Read,
    S: RecordSink + ?Sized,
{
    let pass = Pass::Decrypt;
    let chunk = config.block_chunk();
    let iv: Iv16 = read_iv(splitter, pass)?;

    let cbc = CbcDecryptReader::new(&mut *splitter, keys.cipher_key(), &iv, chunk, pass);
    let mut plain = BufReader::with_capacity(chunk, cbc);

    let records = {
        let mut gz = GzDecoder::new(&mut plain);
        read_records(&mut gz, sink, config.max_record_len, pass)?
    };
    debug!(records, "import pass 2: gzip member complete");

    let padding_len = strip_padding(&mut plain, pass)?;
    let ciphertext_len = plain.get_ref().ciphertext_len();

    Ok(Decrypted {
        records,
        ciphertext_len,
        padding_len,
    })
}
