//! rowcheck: concurrent insert-and-verify stress harness
//!
//! Workers claim contiguous id batches from a shared counter, insert
//! synthesized rows into the database under test, and record every
//! accepted row in a per-worker archive. A later pass replays the archives
//! and checks each row is still in the database with the same values.
//!
//! This crate re-exports the public API of the workspace crates.
//!
//! ```no_run
//! use rowcheck::{Harness, HarnessConfig};
//!
//! let config = HarnessConfig {
//!     rows: 1000,
//!     workers: 4,
//!     batch_size: 10,
//!     ..Default::default()
//! };
//! let report = Harness::new(config)?.run()?;
//! assert!(report.passed());
//! # Ok::<(), rowcheck::EngineError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use rowcheck_concurrency::{BatchClaim, ClaimOutcome, IdAllocator, Milestones, ProgressCounter, StopFlag};
pub use rowcheck_core::{CodecError, Entry};
pub use rowcheck_durability::{ArchiveError, ArchiveLog, LedgerError, ProgressLedger};
pub use rowcheck_engine::{
    open_database, Connection, Database, DbError, DbType, EngineError, Harness, HarnessConfig,
    HarnessReport, InsertReport, RunContext, SqlValue, SqliteDatabase, VerifyFailure,
    VerifyReport, TABLE_NAME,
};

/// Varint and fixed-width integer encodings.
pub mod codec {
    pub use rowcheck_core::codec::*;
}

/// Archive and ledger file naming.
pub mod paths {
    pub use rowcheck_durability::paths::*;
}
