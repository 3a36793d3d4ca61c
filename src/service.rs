// src/service.rs

//! # Backup Service
//!
//! Entry point for callers. A [`BackupService`] owns a [`KeyProvider`], a
//! [`BackupConfig`] and one running flag: at most one export or import runs on
//! an instance at a time, and a second call fails fast with
//! [`BackupError::Busy`] instead of queueing.
//!
//! ```
//! use backup_envelope::{BackupService, QuarantineSink, StaticKeys};
//! use std::io::Cursor;
//!
//! # fn main() -> Result<(), backup_envelope::BackupError> {
//! let service = BackupService::new(StaticKeys::new([7u8; 32], vec![9u8; 32])?);
//!
//! let records = vec![b"row 1".to_vec(), b"row 2".to_vec()];
//! let mut envelope = Vec::new();
//! service.export_backup(records.clone().into_iter(), &mut envelope)?;
//!
//! let factory = || Ok::<_, std::io::Error>(Cursor::new(envelope.clone()));
//! let mut restored = QuarantineSink::new(Vec::<Vec<u8>>::new());
//! service.import_backup(&factory, &mut restored)?;
//! assert_eq!(restored.into_inner(), records);
//! # Ok(())
//! # }
//! ```

use crate::config::BackupConfig;
use crate::decryptor::{ImportSummary, ImportVerifier, SourceFactory};
use crate::encryptor::{export_envelope, ExportSummary};
use crate::error::BackupError;
use crate::keys::KeyProvider;
use crate::records::{RecordSink, RecordSource};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, info_span, warn};

pub struct BackupService<K> {
    keys: K,
    config: BackupConfig,
    running: AtomicBool,
}

/// Clears the running flag when the operation settles, on every path.
struct OperationGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> OperationGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Result<Self, BackupError> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BackupError::Busy)?;
        Ok(Self { running })
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

impl<K: KeyProvider> BackupService<K> {
    pub fn new(keys: K) -> Self {
        Self::with_config(keys, BackupConfig::default())
    }

    pub fn with_config(keys: K, config: BackupConfig) -> Self {
        Self {
            keys,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// `true` while an export or import holds the instance.
    pub fn is_busy(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stream every record from `records` into a new envelope on `sink`.
    ///
    /// # Errors
    ///
    /// [`BackupError::Busy`] if another operation is running; otherwise the
    /// first stage error. The sink then holds a partial envelope that must be
    /// discarded.
    pub fn export_backup<S, W>(&self, records: S, sink: W) -> Result<ExportSummary, BackupError>
    where
        S: RecordSource,
        W: Write,
    {
        let _guard = self.acquire("export")?;
        let span = info_span!("backup_export");
        let _enter = span.enter();

        self.config.validate()?;
        let keys = self.keys.key_material()?;
        info!(chunk_size = self.config.chunk_size, "export started");

        let summary = export_envelope(records, sink, &keys, &self.config).inspect_err(|e| {
            error!(error = %e, "export failed");
        })?;
        info!(
            records = summary.records,
            compressed_len = summary.compressed_len,
            padded_len = summary.padded_len,
            envelope_len = summary.envelope_len,
            "export finished"
        );
        Ok(summary)
    }

    /// Authenticate the envelope behind `factory`, then decrypt it into `sink`.
    ///
    /// The factory is opened twice. `sink` is committed only after the second
    /// MAC check passes and aborted on any failure after decryption began.
    pub fn import_backup<F, S>(&self, factory: &F, sink: &mut S) -> Result<ImportSummary, BackupError>
    where
        F: SourceFactory,
        S: RecordSink + ?Sized,
    {
        let _guard = self.acquire("import")?;
        let span = info_span!("backup_import");
        let _enter = span.enter();

        self.config.validate()?;
        let keys = self.keys.key_material()?;
        info!("import started");

        let mut verifier = ImportVerifier::new(factory, sink, &keys, &self.config);
        let summary = verifier.run().inspect_err(|e| {
            if e.is_authentication_failure() {
                error!(error = %e, state = ?verifier.state(), "import rejected");
            } else {
                error!(error = %e, "import failed");
            }
        })?;
        info!(
            records = summary.records,
            envelope_len = summary.envelope_len,
            "import finished"
        );
        Ok(summary)
    }

    fn acquire(&self, operation: &'static str) -> Result<OperationGuard<'_>, BackupError> {
        OperationGuard::acquire(&self.running).inspect_err(|_| {
            warn!(operation, "rejected: another backup operation is running");
        })
    }
}
