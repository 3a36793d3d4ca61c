//! # Error Types
//!
//! Every operation returns [`Result<T, BackupError>`](BackupError). Variants carry
//! the [`Pass`] and [`Stage`] that failed so an operator can tell a tampered
//! envelope from a broken file handle without ever seeing key material.

use std::fmt;
use std::io;
use thiserror::Error;

/// Which walk over the data was running when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Writing a new envelope.
    Export,
    /// Import pass 1: MAC over the whole envelope, payload discarded.
    Verify,
    /// Import pass 2: decrypt, decompress, reframe and re-check the MAC.
    Decrypt,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Pass::Export => "export",
            Pass::Verify => "import pass 1 (verify)",
            Pass::Decrypt => "import pass 2 (decrypt)",
        })
    }
}

/// Pipeline stage an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Source,
    Records,
    Compression,
    Padding,
    Cipher,
    Mac,
    Sink,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Source => "source",
            Stage::Records => "records",
            Stage::Compression => "compression",
            Stage::Padding => "padding",
            Stage::Cipher => "cipher",
            Stage::Mac => "mac",
            Stage::Sink => "sink",
        })
    }
}

/// The error type for all export and import operations.
#[derive(Error, Debug)]
pub enum BackupError {
    /// Another export or import is already running on this service instance.
    #[error("backup operation already in progress")]
    Busy,

    /// The stream ended before a complete IV and MAC tag were observed.
    #[error("{pass}: stream ended before a MAC tag was observed")]
    MissingAuthentication { pass: Pass },

    /// The computed MAC does not match the envelope's tag.
    ///
    /// Fatal: output already delivered in pass 2 must be discarded.
    #[error("{pass}: MAC verification failed")]
    AuthenticationFailed { pass: Pass },

    /// Compression container, padding or record framing is corrupt.
    #[error("{pass}: malformed {stage} container: {reason}")]
    MalformedContainer {
        pass: Pass,
        stage: Stage,
        reason: String,
    },

    /// Block alignment, PKCS#7 trailer, key/IV misuse or RNG failure.
    #[error("{pass}: cipher error: {reason}")]
    Cipher { pass: Pass, reason: String },

    /// I/O failure while reading the source or writing the sink.
    #[error("{pass}: I/O error in {stage} stage: {source}")]
    Io {
        pass: Pass,
        stage: Stage,
        #[source]
        source: io::Error,
    },

    /// Key material was rejected or could not be derived.
    #[error("key material error: {0}")]
    KeyMaterial(String),

    /// Invalid [`BackupConfig`](crate::BackupConfig).
    #[error("configuration error: {0}")]
    Config(String),

    /// The record sink refused a record or failed to commit.
    #[error("record sink error: {0}")]
    Sink(String),
}

impl BackupError {
    /// `true` for the two errors that mean the envelope cannot be trusted.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            BackupError::AuthenticationFailed { .. } | BackupError::MissingAuthentication { .. }
        )
    }

    /// Returns a closure that attributes an [`io::Error`] to `pass` and `stage`.
    ///
    /// Errors that already carry a `BackupError` (raised inside one of our
    /// `Read` adapters) are unwrapped instead of being re-labelled.
    pub(crate) fn io(pass: Pass, stage: Stage) -> impl FnOnce(io::Error) -> BackupError {
        move |err| BackupError::from_io(err, pass, stage)
    }

    pub(crate) fn from_io(err: io::Error, pass: Pass, stage: Stage) -> BackupError {
        match unwrap_embedded(err) {
            Ok(inner) => inner,
            Err(source) => BackupError::Io {
                pass,
                stage,
                source,
            },
        }
    }

    /// Like [`from_io`](Self::from_io) for errors surfacing from the gzip
    /// decoder: anything it raised on its own means the container is corrupt.
    pub(crate) fn from_decompress_io(err: io::Error, pass: Pass) -> BackupError {
        match unwrap_embedded(err) {
            Ok(inner) => inner,
            Err(source) => BackupError::MalformedContainer {
                pass,
                stage: Stage::Compression,
                reason: source.to_string(),
            },
        }
    }

    /// Carry this error through a `Read`/`Write` boundary.
    pub(crate) fn into_io(self) -> io::Error {
        io::Error::other(self)
    }
}

fn unwrap_embedded(err: io::Error) -> Result<BackupError, io::Error> {
    let embedded = err
        .get_ref()
        .is_some_and(|inner| inner.is::<BackupError>());
    if !embedded {
        return Err(err);
    }
    let kind = err.kind();
    match err.into_inner().map(|inner| inner.downcast::<BackupError>()) {
        Some(Ok(inner)) => Ok(*inner),
        Some(Err(other)) => Err(io::Error::new(kind, other)),
        None => Err(io::Error::from(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_in_messages() {
        let err = BackupError::Io {
            pass: Pass::Decrypt,
            stage: Stage::Compression,
            source: io::Error::other("eof"),
        };
        assert!(err.to_string().contains("compression"), "{err}");

        let names: Vec<String> = [
            Stage::Source,
            Stage::Records,
            Stage::Compression,
            Stage::Padding,
            Stage::Cipher,
            Stage::Mac,
            Stage::Sink,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(
            names,
            ["source", "records", "compression", "padding", "cipher", "mac", "sink"]
        );
    }

    #[test]
    fn embedded_error_survives_io_round_trip() {
        let original = BackupError::Cipher {
            pass: Pass::Decrypt,
            reason: "ciphertext is not block aligned".into(),
        };
        let carried = original.into_io();
        let recovered = BackupError::from_io(carried, Pass::Export, Stage::Sink);
        assert!(matches!(
            recovered,
            BackupError::Cipher {
                pass: Pass::Decrypt,
                ..
            }
        ));
    }

    #[test]
    fn plain_io_error_gets_context() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let mapped = BackupError::from_io(err, Pass::Verify, Stage::Source);
        match mapped {
            BackupError::Io {
                pass, stage, source, ..
            } => {
                assert_eq!(pass, Pass::Verify);
                assert_eq!(stage, Stage::Source);
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn decoder_errors_become_malformed_container() {
        let err = io::Error::new(io::ErrorKind::InvalidInput, "corrupt deflate stream");
        let mapped = BackupError::from_decompress_io(err, Pass::Decrypt);
        assert!(matches!(
            mapped,
            BackupError::MalformedContainer {
                stage: Stage::Compression,
                ..
            }
        ));
    }

    #[test]
    fn display_names_pass_and_stage() {
        let err = BackupError::MalformedContainer {
            pass: Pass::Decrypt,
            stage: Stage::Records,
            reason: "truncated record".into(),
        };
        assert_eq!(
            err.to_string(),
            "import pass 2 (decrypt): malformed records container: truncated record"
        );
        assert_eq!(
            BackupError::AuthenticationFailed { pass: Pass::Verify }.to_string(),
            "import pass 1 (verify): MAC verification failed"
        );
    }
}
