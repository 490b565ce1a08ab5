//! Durability layer for rowcheck
//!
//! - `archive`: per-worker append-only entry log (ArchiveLog)
//! - `ledger`: per-worker cumulative entry counts (ProgressLedger)
//! - `paths`: deterministic file naming under the data directory

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod archive;
pub mod error;
pub mod ledger;
pub mod paths;

pub use archive::{open_all, ArchiveLog, READ_CHUNK};
pub use error::{ArchiveError, LedgerError, Result};
pub use ledger::ProgressLedger;
pub use paths::{archive_file_name, archive_path, ledger_path, LEDGER_FILE_NAME};
