//! Progress ledger: cumulative archived-entry counts per worker
//!
//! # Format
//!
//! ```text
//! ledger := fixed64(worker_count) { fixed64(entry_count_i) }*   i in [0, worker_count)
//! ```
//!
//! All integers are 8-byte little-endian. The file is rewritten wholesale
//! (truncate + write + fsync) at the end of every insertion run and only read
//! otherwise.
//!
//! The counts are cumulative across runs: a run stores
//! `previous_count + appended_this_run` for each worker.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use rowcheck_core::{encode_fixed_u64, get_fixed_u64, FIXED_LEN};

use crate::error::LedgerError;
use crate::paths::ledger_path;

/// Handle to the ledger file.
#[derive(Debug, Clone)]
pub struct ProgressLedger {
    path: PathBuf,
}

impl ProgressLedger {
    /// Ledger at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ledger at its conventional name under `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(ledger_path(dir))
    }

    /// Ledger file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the ledger with `counts`, one per worker, and fsync it.
    pub fn store(&self, counts: &[u64]) -> Result<(), LedgerError> {
        let mut data = Vec::with_capacity(FIXED_LEN * (counts.len() + 1));
        data.extend_from_slice(&encode_fixed_u64(counts.len() as u64));
        for &count in counts {
            data.extend_from_slice(&encode_fixed_u64(count));
        }

        let io_err = |source| LedgerError::Io {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(io_err)?;
        file.write_all(&data).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;

        tracing::debug!(
            target: "rowcheck::ledger",
            path = %self.path.display(),
            workers = counts.len(),
            total = counts.iter().sum::<u64>(),
            "Stored progress ledger"
        );
        Ok(())
    }

    /// Load per-worker counts, checking them against `expected_workers`.
    ///
    /// `quiet` suppresses warning events, for callers probing whether a
    /// ledger exists at all.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] if the file does not exist.
    /// - [`LedgerError::Incomplete`] if the file is shorter than its header
    ///   or than `8 * (1 + expected_workers)` bytes.
    /// - [`LedgerError::WorkerCountMismatch`] if the header disagrees with
    ///   `expected_workers`.
    pub fn load(&self, expected_workers: usize, quiet: bool) -> Result<Vec<u64>, LedgerError> {
        let result = self.read_counts(expected_workers);
        if let Err(e) = &result {
            if !quiet {
                tracing::warn!(target: "rowcheck::ledger", error = %e, "Load progress ledger failed");
            }
        }
        result
    }

    fn read_counts(&self, expected_workers: usize) -> Result<Vec<u64>, LedgerError> {
        let data = fs::read(&self.path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                LedgerError::NotFound {
                    path: self.path.clone(),
                }
            } else {
                LedgerError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let Some(stored) = get_fixed_u64(&data, 0) else {
            return Err(LedgerError::Incomplete {
                len: data.len(),
                expected: FIXED_LEN,
            });
        };
        if stored != expected_workers as u64 {
            return Err(LedgerError::WorkerCountMismatch {
                stored,
                configured: expected_workers,
            });
        }

        (0..expected_workers)
            .map(|i| {
                get_fixed_u64(&data, FIXED_LEN * (i + 1)).ok_or(LedgerError::Incomplete {
                    len: data.len(),
                    expected: FIXED_LEN * (expected_workers + 1),
                })
            })
            .collect()
    }
}
