//! File naming for archives and the ledger
//!
//! Both live directly under the run's data directory. Names are derived
//! from the worker index only, so a later run with the same worker count
//! finds the same files.

use std::path::{Path, PathBuf};

/// Prefix of every archive file name.
pub const ARCHIVE_PREFIX: &str = "rowcheck_archive_";

/// File name of the progress ledger.
pub const LEDGER_FILE_NAME: &str = "rowcheck_entry_num";

/// Archive file name for `worker`.
pub fn archive_file_name(worker: usize) -> String {
    format!("{}{}", ARCHIVE_PREFIX, worker)
}

/// Archive path for `worker` under `dir`.
pub fn archive_path(dir: &Path, worker: usize) -> PathBuf {
    dir.join(archive_file_name(worker))
}

/// Ledger path under `dir`.
pub fn ledger_path(dir: &Path) -> PathBuf {
    dir.join(LEDGER_FILE_NAME)
}
