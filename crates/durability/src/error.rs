//! Error types for archives and the progress ledger

use std::io;
use std::path::PathBuf;

use rowcheck_core::CodecError;
use thiserror::Error;

/// Result type for archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Errors from an [`ArchiveLog`](crate::ArchiveLog).
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Every appended byte has been read. Normal scan terminator.
    #[error("read end of archive file")]
    EndOfData,

    /// The file ended inside an entry, e.g. a crash during an append.
    #[error("archive file is incomplete: worker {worker}, entry at offset {offset}")]
    Incomplete {
        /// Worker owning the archive
        worker: usize,
        /// Byte offset where the unfinished entry starts
        offset: u64,
    },

    /// The bytes at `offset` cannot be an entry.
    #[error("archive corrupt: worker {worker}, entry at offset {offset}: {source}")]
    Corrupt {
        /// Worker owning the archive
        worker: usize,
        /// Byte offset where the entry starts
        offset: u64,
        /// Decoding failure
        #[source]
        source: CodecError,
    },

    /// The OS accepted only part of an append.
    #[error("short archive write: worker {worker}, wrote {written} of {expected} bytes")]
    ShortWrite {
        /// Worker owning the archive
        worker: usize,
        /// Bytes actually written
        written: usize,
        /// Bytes requested
        expected: usize,
    },

    /// The archive file could not be opened.
    #[error("open archive {path:?} failed: {source}")]
    Open {
        /// Archive path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Any other I/O failure.
    #[error("archive I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ArchiveError {
    /// True for the normal end-of-scan condition.
    pub fn is_end_of_data(&self) -> bool {
        matches!(self, ArchiveError::EndOfData)
    }
}

/// Errors from the [`ProgressLedger`](crate::ProgressLedger).
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No ledger file exists. Callers may treat this as a first run.
    #[error("entry number file {path:?} not found")]
    NotFound {
        /// Ledger path
        path: PathBuf,
    },

    /// The file is shorter than its header says it should be.
    #[error("entry number file is incomplete: {len} bytes, expected at least {expected}")]
    Incomplete {
        /// Actual file length
        len: usize,
        /// Minimum length required
        expected: usize,
    },

    /// The file was written by a run with a different worker count.
    #[error("different worker number: ledger has {stored}, configured {configured}")]
    WorkerCountMismatch {
        /// Worker count in the ledger header
        stored: u64,
        /// Worker count of this run
        configured: usize,
    },

    /// Reading or writing the ledger failed.
    #[error("entry number file {path:?} I/O error: {source}")]
    Io {
        /// Ledger path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl LedgerError {
    /// True when the ledger simply does not exist yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound { .. })
    }
}
