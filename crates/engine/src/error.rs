//! Engine error type

use std::io;
use std::path::PathBuf;

use rowcheck_durability::{ArchiveError, LedgerError};
use thiserror::Error;

use crate::database::DbError;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that abort a run.
///
/// Per-row problems during verification are not errors; they are collected
/// in a [`VerifyReport`](crate::VerifyReport).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The configuration cannot run.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be read.
    #[error("read config file {path:?} failed: {source}")]
    ConfigFile {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid TOML for a config.
    #[error("parse config failed: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Database failure during setup or reconciliation.
    #[error(transparent)]
    Database(#[from] DbError),

    /// Archive failure outside the per-row loops.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Progress ledger failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The table holds rows but there is no ledger describing them.
    #[error("ledger lost: table has rows up to id {max_id} but no progress ledger exists")]
    LedgerLost {
        /// Largest id in the table
        max_id: u64,
    },

    /// The ledger records archived rows but the table is empty.
    #[error("database data lost: progress ledger exists but the table is empty")]
    DatabaseDataLost,

    /// The existing table disagrees with the configured column count.
    #[error("schema mismatch: table has {table_extra} extra columns, configured {configured_extra}")]
    SchemaMismatch {
        /// Extra columns found in the table
        table_extra: usize,
        /// Extra columns configured
        configured_extra: usize,
    },

    /// A statement of a SQL script failed.
    #[error("sql script {path:?} line {line} failed: {source}")]
    Script {
        /// Script path
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// Database error
        #[source]
        source: DbError,
    },

    /// A SQL script could not be read.
    #[error("read sql script {path:?} failed: {source}")]
    ScriptRead {
        /// Script path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The data directory could not be created.
    #[error("create data dir {path:?} failed: {source}")]
    DataDir {
        /// Directory path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// A worker thread panicked.
    #[error("worker {worker} panicked")]
    WorkerPanicked {
        /// Worker index
        worker: usize,
    },
}

impl EngineError {
    /// True for the conditions detected while reconciling a resumed run.
    pub fn is_resume_inconsistency(&self) -> bool {
        matches!(
            self,
            EngineError::LedgerLost { .. }
                | EngineError::DatabaseDataLost
                | EngineError::Ledger(LedgerError::WorkerCountMismatch { .. })
        )
    }
}
